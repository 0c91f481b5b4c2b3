// Copyright (c) 2023 Mike Tsao. All rights reserved.

use std::{collections::HashMap, hash::Hash};

/// A set of sticky on/off switches. A key that has never been toggled reads as
/// the set's default. Toggling flips whatever the key currently reads as, and
/// remembers the result. Entries are never removed; to forget everything,
/// replace the whole set with a new one.
#[derive(Clone, Debug)]
pub struct ToggleSet<K: Eq + Hash> {
    default_state: bool,
    states: HashMap<K, bool>,
}
impl<K: Eq + Hash> Default for ToggleSet<K> {
    fn default() -> Self {
        Self::new_with(false)
    }
}
impl<K: Eq + Hash> ToggleSet<K> {
    /// Creates an empty set whose untouched keys read as `default_state`.
    pub fn new_with(default_state: bool) -> Self {
        Self {
            default_state,
            states: HashMap::default(),
        }
    }

    /// Flips the key and returns its new state.
    pub fn toggle(&mut self, key: K) -> bool {
        let state = !self.states.get(&key).copied().unwrap_or(self.default_state);
        self.states.insert(key, state);
        state
    }

    /// The key's current state.
    pub fn get(&self, key: &K) -> bool {
        self.states.get(key).copied().unwrap_or(self.default_state)
    }

    /// The state that untouched keys read as.
    pub fn default_state(&self) -> bool {
        self.default_state
    }
}

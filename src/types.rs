// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Common data types used throughout the system.

use serde::{Deserialize, Serialize};

/// Index of a key within one octave. 0..=11 are the semitones starting at C,
/// and 12 is the C at the top of the octave.
pub type Channel = u8;

/// Vertical transposition index. Track instruments reuse it as a
/// playback-rate selector.
pub type Octave = u8;

/// Number of semitones in an octave, which is also the slot stride when files
/// or pitches are laid out octave by octave.
pub const SEMITONES_PER_OCTAVE: usize = 12;

/// The highest note channel. It repeats the tonic one octave up.
pub const TOP_CHANNEL: Channel = 12;

/// Names for every key on the controller, including the three function keys
/// that follow the thirteen note keys.
pub const KEY_NAMES: [&str; 16] = [
    "C",
    "C#",
    "D",
    "D#",
    "E",
    "F",
    "F#",
    "G",
    "G#",
    "A",
    "A#",
    "B",
    "C",
    "octave_down",
    "octave_up",
    "instrument",
];

/// Returns the human-readable name of a controller key.
pub fn key_name(channel: Channel) -> Option<&'static str> {
    KEY_NAMES.get(channel as usize).copied()
}

/// Whether the channel addresses one of the thirteen note keys.
pub fn is_note_channel(channel: Channel) -> bool {
    channel <= TOP_CHANNEL
}

/// The octave window that the active instrument allows. `current` may equal
/// `max`; the upper bound is inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OctaveRange {
    /// The octave that note events are played in.
    pub current: Octave,
    /// The largest allowed value of `current`.
    pub max: Octave,
}
impl OctaveRange {
    /// Creates a range positioned at `initial`.
    pub fn new_with(initial: Octave, max: Octave) -> Self {
        Self {
            current: initial,
            max,
        }
    }

    /// Moves up one octave, stopping at `max`. Returns the new octave.
    pub fn step_up(&mut self) -> Octave {
        self.current = self.current.saturating_add(1).min(self.max);
        self.current
    }

    /// Moves down one octave, stopping at zero. Returns the new octave.
    pub fn step_down(&mut self) -> Octave {
        self.current = self.current.saturating_sub(1);
        self.current
    }
}

// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Sources of key events.
//!
//! A controller source turns whatever the player touches into
//! [ControllerEvent]s and sends them down a crossbeam channel to the event
//! loop. Quitting travels the same channel as [InputEvent::Quit] but never
//! reaches the dispatcher.

use crate::{settings::ControllerSettings, types::Channel, Result};
use crossbeam_channel::Sender;
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{self, disable_raw_mode, enable_raw_mode},
};
use std::{
    collections::HashMap,
    io::stdout,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

/// A key went down or up on the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerEvent {
    #[allow(missing_docs)]
    Note { channel: Channel, pressed: bool },
    #[allow(missing_docs)]
    OctaveUp { pressed: bool },
    #[allow(missing_docs)]
    OctaveDown { pressed: bool },
    #[allow(missing_docs)]
    InstrumentCycle { pressed: bool },
}

/// What the event loop receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    #[allow(missing_docs)]
    Controller(ControllerEvent),
    /// Stop the event loop.
    Quit,
}
impl From<ControllerEvent> for InputEvent {
    fn from(value: ControllerEvent) -> Self {
        Self::Controller(value)
    }
}

/// What a single key does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyAction {
    #[allow(missing_docs)]
    Note(Channel),
    #[allow(missing_docs)]
    OctaveDown,
    #[allow(missing_docs)]
    OctaveUp,
    #[allow(missing_docs)]
    Instrument,
    #[allow(missing_docs)]
    Quit,
}
impl KeyAction {
    /// The event for this key going down (`pressed`) or up.
    pub fn event(&self, pressed: bool) -> InputEvent {
        match self {
            KeyAction::Note(channel) => ControllerEvent::Note {
                channel: *channel,
                pressed,
            }
            .into(),
            KeyAction::OctaveDown => ControllerEvent::OctaveDown { pressed }.into(),
            KeyAction::OctaveUp => ControllerEvent::OctaveUp { pressed }.into(),
            KeyAction::Instrument => ControllerEvent::InstrumentCycle { pressed }.into(),
            KeyAction::Quit => InputEvent::Quit,
        }
    }
}

/// Maps terminal keys to actions. `q`, Esc and Ctrl-C always quit.
#[derive(Clone, Debug)]
pub struct KeyMap {
    keys: HashMap<char, KeyAction>,
    hold: Duration,
}
impl Default for KeyMap {
    fn default() -> Self {
        Self::new_with(&ControllerSettings::default())
    }
}
impl KeyMap {
    /// Builds the map from the configured layout.
    pub fn new_with(settings: &ControllerSettings) -> Self {
        let mut keys: HashMap<char, KeyAction> = settings
            .note_keys
            .chars()
            .enumerate()
            .map(|(i, c)| (c.to_ascii_lowercase(), KeyAction::Note(i as Channel)))
            .collect();
        keys.insert(
            settings.octave_down_key.to_ascii_lowercase(),
            KeyAction::OctaveDown,
        );
        keys.insert(
            settings.octave_up_key.to_ascii_lowercase(),
            KeyAction::OctaveUp,
        );
        keys.insert(
            settings.instrument_key.to_ascii_lowercase(),
            KeyAction::Instrument,
        );
        keys.insert('q', KeyAction::Quit);
        Self {
            keys,
            hold: Duration::from_millis(settings.key_hold_ms),
        }
    }

    /// How long a key stays down after its last press on terminals that
    /// can't report releases. See [HeldKeys].
    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// The action for a key, if it has one.
    pub fn action(&self, key: &KeyEvent) -> Option<KeyAction> {
        match key.code {
            KeyCode::Esc => Some(KeyAction::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(KeyAction::Quit)
            }
            KeyCode::Char(c) => self.keys.get(&c.to_ascii_lowercase()).copied(),
            _ => None,
        }
    }

    /// Turns one key event from a terminal that reports releases into input
    /// events: one per edge, with auto-repeat dropped.
    pub fn translate(&self, key: &KeyEvent) -> Vec<InputEvent> {
        let Some(action) = self.action(key) else {
            return Vec::default();
        };
        match (key.kind, action) {
            (KeyEventKind::Press, KeyAction::Quit) => vec![InputEvent::Quit],
            (_, KeyAction::Quit) => Vec::default(),
            (KeyEventKind::Press, action) => vec![action.event(true)],
            (KeyEventKind::Release, action) => vec![action.event(false)],
            (KeyEventKind::Repeat, _) => Vec::default(),
        }
    }
}

/// Stands in for key releases on terminals that only report presses.
///
/// While a key is held, the terminal's auto-repeat keeps sending presses. The
/// first one goes through as a press, the rest only keep the key down, and
/// once they have stopped for the hold time the key is released.
#[derive(Debug)]
pub struct HeldKeys {
    hold: Duration,
    held: HashMap<KeyAction, Instant>,
}
impl HeldKeys {
    #[allow(missing_docs)]
    pub fn new_with(hold: Duration) -> Self {
        Self {
            hold,
            held: HashMap::default(),
        }
    }

    /// Handles one terminal key event that arrived at `now`.
    pub fn key(&mut self, keymap: &KeyMap, key: &KeyEvent, now: Instant) -> Vec<InputEvent> {
        if key.kind != KeyEventKind::Press {
            return Vec::default();
        }
        match keymap.action(key) {
            None => Vec::default(),
            Some(KeyAction::Quit) => vec![InputEvent::Quit],
            Some(action) => match self.held.insert(action, now) {
                Some(_) => Vec::default(),
                None => vec![action.event(true)],
            },
        }
    }

    /// Releases every key that hasn't been pressed within the hold time
    /// before `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<InputEvent> {
        let mut released: Vec<KeyAction> = self
            .held
            .iter()
            .filter(|(_, last)| now.duration_since(**last) >= self.hold)
            .map(|(action, _)| *action)
            .collect();
        released.sort();
        released
            .into_iter()
            .map(|action| {
                self.held.remove(&action);
                action.event(false)
            })
            .collect()
    }

    /// Whether any key is down.
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Reads keys from the terminal on a background thread.
///
/// While this exists the terminal is in raw mode. Dropping it stops the
/// thread and restores the terminal.
#[derive(Debug)]
pub struct TerminalKeyboard {
    is_running: Arc<AtomicBool>,
    reports_releases: bool,
    handle: Option<JoinHandle<()>>,
}
impl TerminalKeyboard {
    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Puts the terminal in raw mode and starts sending events to `sender`.
    pub fn start(keymap: KeyMap, sender: Sender<InputEvent>) -> Result<Self> {
        enable_raw_mode()?;
        let reports_releases = matches!(terminal::supports_keyboard_enhancement(), Ok(true))
            && execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        if !reports_releases {
            log::info!(
                "terminal can't report key releases; keys release {:?} after their last repeat",
                keymap.hold()
            );
        }

        let is_running = Arc::new(AtomicBool::new(true));
        let handle = {
            let is_running = Arc::clone(&is_running);
            let mut held = (!reports_releases).then(|| HeldKeys::new_with(keymap.hold()));
            std::thread::spawn(move || {
                while is_running.load(Ordering::Relaxed) {
                    let mut events = held
                        .as_mut()
                        .map(|held| held.expire(Instant::now()))
                        .unwrap_or_default();
                    match event::poll(Self::POLL_INTERVAL) {
                        Ok(false) => {}
                        Ok(true) => {
                            if let Ok(Event::Key(key)) = event::read() {
                                events.extend(match held.as_mut() {
                                    Some(held) => held.key(&keymap, &key, Instant::now()),
                                    None => keymap.translate(&key),
                                });
                            }
                        }
                        Err(e) => {
                            log::error!("while polling terminal: {e}");
                            let _ = sender.send(InputEvent::Quit);
                            break;
                        }
                    }
                    for event in events {
                        if sender.send(event).is_err() {
                            return;
                        }
                    }
                }
            })
        };
        Ok(Self {
            is_running,
            reports_releases,
            handle: Some(handle),
        })
    }

    /// Whether releases come from the terminal rather than from [HeldKeys].
    pub fn reports_releases(&self) -> bool {
        self.reports_releases
    }

    /// Stops reading and restores the terminal.
    pub fn stop(&mut self) -> Result<()> {
        self.is_running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("keyboard thread panicked");
            }
            if self.reports_releases {
                execute!(stdout(), PopKeyboardEnhancementFlags)?;
            }
            disable_raw_mode()?;
        }
        Ok(())
    }
}
impl Drop for TerminalKeyboard {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("while restoring terminal: {e}");
        }
    }
}

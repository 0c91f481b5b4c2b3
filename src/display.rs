// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Where the runtime reports what it's doing.

use crate::{
    instruments::ToggleChange,
    types::{key_name, Channel, Octave},
};
use std::{
    io::Write,
    sync::{Arc, Mutex},
};

/// Receives everything the player should see. Implementations must return
/// quickly; they run on the event loop, between key events.
pub trait DisplaySink {
    /// A key went down or up.
    fn render_key_state(&mut self, channel: Channel, pressed: bool);

    /// The octave or the active instrument's octave range changed.
    fn render_octave_bar(&mut self, octave: Octave, max: Octave);

    /// A status line: the active instrument's name and what it said.
    fn show_status(&mut self, name: &str, message: &str);

    /// An instrument switched one of its toggles.
    fn render_toggle(&mut self, change: &ToggleChange);
}

/// Formats a status line the way every sink shows it.
pub fn status_line(name: &str, message: &str) -> String {
    if name.is_empty() {
        message.to_string()
    } else {
        format!("{name} {message}")
    }
}

/// Prints status lines to a terminal. Lines end in `\r\n` because the
/// terminal is usually in raw mode while the runtime is listening for keys.
#[derive(Debug)]
pub struct ConsoleDisplay<W: Write> {
    out: W,
    last_octave_bar: Option<(Octave, Octave)>,
}
impl Default for ConsoleDisplay<std::io::Stdout> {
    fn default() -> Self {
        Self::new_with(std::io::stdout())
    }
}
impl<W: Write> ConsoleDisplay<W> {
    /// The octave bar never shows more than this many cells.
    pub const OCTAVE_BAR_CELLS: Octave = 10;

    #[allow(missing_docs)]
    pub fn new_with(out: W) -> Self {
        Self {
            out,
            last_octave_bar: None,
        }
    }

    #[allow(missing_docs)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, line: &str) {
        if let Err(e) = write!(self.out, "{line}\r\n").and_then(|_| self.out.flush()) {
            log::warn!("while writing to console: {e}");
        }
    }
}
impl<W: Write> DisplaySink for ConsoleDisplay<W> {
    fn render_key_state(&mut self, channel: Channel, pressed: bool) {
        log::trace!(
            "key {} {}",
            key_name(channel).unwrap_or("?"),
            if pressed { "down" } else { "up" }
        );
    }

    fn render_octave_bar(&mut self, octave: Octave, max: Octave) {
        if self.last_octave_bar == Some((octave, max)) {
            return;
        }
        self.last_octave_bar = Some((octave, max));
        let cells = max.min(Self::OCTAVE_BAR_CELLS);
        if cells == 0 {
            return;
        }
        let bar: String = (1..=cells)
            .map(|i| if i <= octave { '#' } else { '.' })
            .collect();
        self.print(&format!("octave [{bar}] {octave}/{max}"));
    }

    fn show_status(&mut self, name: &str, message: &str) {
        self.print(&status_line(name, message));
    }

    fn render_toggle(&mut self, change: &ToggleChange) {
        log::debug!(
            "indicator {} ({}) {}",
            change.key,
            change.kind,
            if change.enabled { "lit" } else { "dark" }
        );
    }
}

/// One call made on a [RecordingDisplay].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    #[allow(missing_docs)]
    KeyState(Channel, bool),
    #[allow(missing_docs)]
    OctaveBar(Octave, Octave),
    /// The formatted status line.
    Status(String),
    #[allow(missing_docs)]
    Toggle(ToggleChange),
}

/// A [DisplaySink] that remembers everything. Clones share the same
/// recording, so one can be handed to the runtime and another kept for
/// inspection.
#[derive(Clone, Debug, Default)]
pub struct RecordingDisplay(Arc<Mutex<Vec<DisplayEvent>>>);
impl RecordingDisplay {
    /// Every call so far, oldest first.
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Just the status lines.
    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[allow(missing_docs)]
    pub fn last_status(&self) -> Option<String> {
        self.statuses().pop()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut events) = self.0.lock() {
            events.clear();
        }
    }

    fn push(&mut self, event: DisplayEvent) {
        if let Ok(mut events) = self.0.lock() {
            events.push(event);
        }
    }
}
impl DisplaySink for RecordingDisplay {
    fn render_key_state(&mut self, channel: Channel, pressed: bool) {
        self.push(DisplayEvent::KeyState(channel, pressed));
    }

    fn render_octave_bar(&mut self, octave: Octave, max: Octave) {
        self.push(DisplayEvent::OctaveBar(octave, max));
    }

    fn show_status(&mut self, name: &str, message: &str) {
        self.push(DisplayEvent::Status(status_line(name, message)));
    }

    fn render_toggle(&mut self, change: &ToggleChange) {
        self.push(DisplayEvent::Toggle(*change));
    }
}

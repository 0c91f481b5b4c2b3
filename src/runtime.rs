// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Routes controller events to the active instrument and the display.

use crate::{
    audio::AudioDevice,
    controller::{ControllerEvent, InputEvent},
    display::DisplaySink,
    instruments::{DefaultInstrument, Instrument, Status},
    registry::{report, InstrumentRegistry, RemoveTarget},
    types::{is_note_channel, Channel},
    Result,
};
use crossbeam_channel::Receiver;

/// Owns the instruments and the display, and handles one event at a time.
pub struct RuntimeDispatcher {
    registry: InstrumentRegistry,
    display: Box<dyn DisplaySink>,
}
impl std::fmt::Debug for RuntimeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeDispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
impl RuntimeDispatcher {
    /// Starts with a [DefaultInstrument] registered and selected, so there is
    /// always something to play.
    pub fn new_with(device: AudioDevice, display: Box<dyn DisplaySink>) -> Result<Self> {
        let mut r = Self {
            registry: InstrumentRegistry::new_with(device),
            display,
        };
        r.add_instrument(Box::<DefaultInstrument>::default());
        r.select_instrument(0)?;
        Ok(r)
    }

    #[allow(missing_docs)]
    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    /// Where status lines go.
    pub fn display_mut(&mut self) -> &mut dyn DisplaySink {
        self.display.as_mut()
    }

    /// Registers an instrument. Returns the new count.
    pub fn add_instrument(&mut self, instrument: Box<dyn Instrument>) -> usize {
        self.registry.add(instrument, self.display.as_mut())
    }

    #[allow(missing_docs)]
    pub fn select_instrument(&mut self, index: usize) -> Result<()> {
        self.registry.select(index, self.display.as_mut())
    }

    #[allow(missing_docs)]
    pub fn remove_instrument(
        &mut self,
        target: impl Into<RemoveTarget>,
    ) -> Result<Option<Box<dyn Instrument>>> {
        self.registry.remove(target.into(), self.display.as_mut())
    }

    /// Shows a message after the active instrument's name.
    pub fn message(&mut self, message: &str) {
        self.display.show_status(self.registry.active_name(), message);
    }

    /// The startup banner.
    pub fn welcome(&mut self) {
        let message = format!("{} instruments. q/<esc> to quit.", self.registry.len());
        self.message(&message);
    }

    /// Handles one controller event to completion. Errors are fatal.
    pub fn handle(&mut self, event: ControllerEvent) -> Result<()> {
        match event {
            ControllerEvent::Note { channel, pressed } => self.handle_note(channel, pressed),
            ControllerEvent::OctaveUp { pressed } => {
                if pressed {
                    self.handle_octave(true)?;
                }
                Ok(())
            }
            ControllerEvent::OctaveDown { pressed } => {
                if pressed {
                    self.handle_octave(false)?;
                }
                Ok(())
            }
            ControllerEvent::InstrumentCycle { pressed } => {
                if pressed {
                    self.registry.cycle(self.display.as_mut())?;
                }
                Ok(())
            }
        }
    }

    fn handle_note(&mut self, channel: Channel, pressed: bool) -> Result<()> {
        if !is_note_channel(channel) {
            return Ok(());
        }
        self.display.render_key_state(channel, pressed);
        let Some(active) = self.registry.active_mut() else {
            return Ok(());
        };
        let octave = active.octave.current;
        let status = if pressed {
            active.instrument.note_on(active.device, channel, octave)?
        } else {
            active.instrument.note_off(active.device, channel, octave)?
        };
        show(self.display.as_mut(), active.instrument.name(), &status);
        Ok(())
    }

    fn handle_octave(&mut self, up: bool) -> Result<()> {
        let Some(active) = self.registry.active_mut() else {
            return Ok(());
        };
        let (octave, status, fallback) = if up {
            let octave = active.octave.step_up();
            let status = active.instrument.octave_up(active.device, octave)?;
            (octave, status, format!("octave up: {octave}"))
        } else {
            let octave = active.octave.step_down();
            let status = active.instrument.octave_down(active.device, octave)?;
            (octave, status, format!("octave down: {octave}"))
        };
        self.display.render_octave_bar(octave, active.octave.max);
        let message = status.text().unwrap_or(fallback.as_str()).to_string();
        report(
            self.display.as_mut(),
            active.instrument.name(),
            &message,
            &status,
        );
        Ok(())
    }

    /// Deselects whatever is active, releasing the device and any MIDI
    /// session.
    pub fn shutdown(&mut self) {
        self.registry.deselect();
    }
}

// Instruments that answer with no message leave the status line alone.
fn show(display: &mut dyn DisplaySink, name: &str, status: &Status) {
    match status.text() {
        Some(message) => report(display, name, message, status),
        None => {
            if let Some(toggle) = status.toggle.as_ref() {
                display.render_toggle(toggle);
            }
        }
    }
}

/// Feeds events to the dispatcher until a quit arrives or every sender is
/// gone. The active instrument is deselected on the way out, error or not.
pub fn run(dispatcher: &mut RuntimeDispatcher, events: &Receiver<InputEvent>) -> Result<()> {
    let result = dispatch_until_quit(dispatcher, events);
    dispatcher.shutdown();
    result
}

fn dispatch_until_quit(
    dispatcher: &mut RuntimeDispatcher,
    events: &Receiver<InputEvent>,
) -> Result<()> {
    for event in events.iter() {
        match event {
            InputEvent::Quit => break,
            InputEvent::Controller(event) => dispatcher.handle(event)?,
        }
    }
    Ok(())
}

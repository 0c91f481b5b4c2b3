// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::CLIENT_NAME;
use crate::{
    controller::{ControllerEvent, InputEvent},
    settings::ControllerSettings,
    types::{Channel, TOP_CHANNEL},
    Error, Result,
};
use crossbeam_channel::Sender;
use derivative::Derivative;
use midir::{MidiInput, MidiInputConnection};
use midly::{live::LiveEvent, MidiMessage};

/// Maps incoming MIDI onto controller keys. Notes from `base_note` up
/// through the next twelve semitones become channels 0..=12, and three
/// control-change numbers act as the function keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiControllerMap {
    base_note: u8,
    octave_down_cc: u8,
    octave_up_cc: u8,
    instrument_cc: u8,
}
impl Default for MidiControllerMap {
    fn default() -> Self {
        Self::new_with(&ControllerSettings::default())
    }
}
impl MidiControllerMap {
    #[allow(missing_docs)]
    pub fn new_with(settings: &ControllerSettings) -> Self {
        Self {
            base_note: settings.base_note,
            octave_down_cc: settings.octave_down_cc,
            octave_up_cc: settings.octave_up_cc,
            instrument_cc: settings.instrument_cc,
        }
    }

    /// The controller event for one raw MIDI message, if it means anything.
    /// Note-on with zero velocity counts as a release. Controller values of
    /// 64 and up count as pressed.
    pub fn translate(&self, bytes: &[u8]) -> Option<ControllerEvent> {
        let LiveEvent::Midi { message, .. } = LiveEvent::parse(bytes).ok()? else {
            return None;
        };
        match message {
            MidiMessage::NoteOn { key, vel } => self.note(key.as_int(), vel.as_int() > 0),
            MidiMessage::NoteOff { key, .. } => self.note(key.as_int(), false),
            MidiMessage::Controller { controller, value } => {
                let pressed = value.as_int() >= 64;
                let controller = controller.as_int();
                if controller == self.octave_down_cc {
                    Some(ControllerEvent::OctaveDown { pressed })
                } else if controller == self.octave_up_cc {
                    Some(ControllerEvent::OctaveUp { pressed })
                } else if controller == self.instrument_cc {
                    Some(ControllerEvent::InstrumentCycle { pressed })
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn note(&self, key: u8, pressed: bool) -> Option<ControllerEvent> {
        let channel: Channel = key.checked_sub(self.base_note)?;
        (channel <= TOP_CHANNEL).then_some(ControllerEvent::Note { channel, pressed })
    }
}

/// A hardware MIDI controller feeding the event loop. Events flow until this
/// is dropped.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct MidiController {
    port_name: String,
    #[derivative(Debug = "ignore")]
    _connection: MidiInputConnection<()>,
}
impl MidiController {
    /// Connects to the first input port whose name contains `port`.
    pub fn start(
        port: &str,
        settings: &ControllerSettings,
        sender: Sender<InputEvent>,
    ) -> Result<Self> {
        let input = MidiInput::new(CLIENT_NAME).map_err(|e| Error::Midi(e.to_string()))?;
        let (midi_port, port_name) = input
            .ports()
            .into_iter()
            .find_map(|p| {
                let name = input.port_name(&p).ok()?;
                name.contains(port).then_some((p, name))
            })
            .ok_or_else(|| Error::Midi(format!("no MIDI input port matches \"{port}\"")))?;

        let map = MidiControllerMap::new_with(settings);
        let connection = input
            .connect(
                &midi_port,
                &format!("{CLIENT_NAME}-controller"),
                move |_timestamp, bytes, _| {
                    if let Some(event) = map.translate(bytes) {
                        log::trace!("controller: {event:?}");
                        let _ = sender.send(event.into());
                    }
                },
                (),
            )
            .map_err(|e| Error::Midi(e.to_string()))?;
        log::info!("listening to MIDI controller {port_name}");
        Ok(Self {
            port_name,
            _connection: connection,
        })
    }

    #[allow(missing_docs)]
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

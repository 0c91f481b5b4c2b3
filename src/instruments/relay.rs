// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{Instrument, Status};
use crate::{
    audio::AudioDevice,
    settings::RelaySettings,
    types::{Channel, Octave, SEMITONES_PER_OCTAVE},
    Error, Result,
};
use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};
use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
};

/// A session with an external program or device that makes the actual sound.
pub trait RelayClient: Debug {
    /// Opens the session.
    fn connect(&mut self) -> Result<()>;

    /// Sends one event. Events arrive in the order they're sent.
    fn send(&mut self, event: LiveEvent<'static>) -> Result<()>;

    /// Closes the session. Harmless if it isn't open.
    fn disconnect(&mut self);
}

#[derive(Debug, Default)]
struct Recording {
    is_connected: bool,
    connects: usize,
    events: Vec<LiveEvent<'static>>,
}

/// A [RelayClient] that remembers everything it was asked to send. Clones
/// share the same recording.
#[derive(Clone, Debug, Default)]
pub struct RecordingRelayClient(Arc<Mutex<Recording>>);
impl RecordingRelayClient {
    /// Everything sent so far.
    pub fn events(&self) -> Vec<LiveEvent<'static>> {
        self.0.lock().map(|r| r.events.clone()).unwrap_or_default()
    }

    #[allow(missing_docs)]
    pub fn is_connected(&self) -> bool {
        self.0.lock().map(|r| r.is_connected).unwrap_or_default()
    }

    /// How many sessions have been opened.
    pub fn connect_count(&self) -> usize {
        self.0.lock().map(|r| r.connects).unwrap_or_default()
    }
}
impl RelayClient for RecordingRelayClient {
    fn connect(&mut self) -> Result<()> {
        if let Ok(mut recording) = self.0.lock() {
            recording.is_connected = true;
            recording.connects += 1;
        }
        Ok(())
    }

    fn send(&mut self, event: LiveEvent<'static>) -> Result<()> {
        let mut recording = self
            .0
            .lock()
            .map_err(|e| Error::Relay(e.to_string()))?;
        if !recording.is_connected {
            return Err(Error::Relay("not connected".to_string()));
        }
        recording.events.push(event);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Ok(mut recording) = self.0.lock() {
            recording.is_connected = false;
        }
    }
}

/// Forwards key events to an external synthesizer as MIDI. The instrument
/// itself makes no sound and never touches the audio device.
#[derive(Debug)]
pub struct RelayInstrument {
    name: String,
    client: Box<dyn RelayClient>,
    settings: RelaySettings,
    patch: u8,
    is_selected: bool,
}
impl RelayInstrument {
    /// `client_name` is what the player sees; `client` does the talking.
    pub fn new_with(client_name: &str, client: Box<dyn RelayClient>, settings: RelaySettings) -> Self {
        Self {
            name: format!("MIDI:{client_name}"),
            client,
            patch: settings.patch,
            settings,
            is_selected: false,
        }
    }

    /// The last program requested.
    pub fn patch(&self) -> u8 {
        self.patch
    }

    /// Switches programs. Requests at or beyond the bank count are ignored.
    /// If the instrument isn't selected, the patch is remembered and sent on
    /// the next select.
    pub fn select_patch(&mut self, patch: u8) -> Result<()> {
        if patch >= self.settings.banks {
            return Ok(());
        }
        self.patch = patch;
        if self.is_selected {
            self.send(MidiMessage::ProgramChange {
                program: u7::from(patch),
            })?;
        }
        Ok(())
    }

    fn send(&mut self, message: MidiMessage) -> Result<()> {
        self.client.send(LiveEvent::Midi {
            channel: u4::from(self.settings.midi_channel),
            message,
        })
    }

    fn pitch(channel: Channel, octave: Octave) -> Option<u8> {
        let pitch = channel as usize + SEMITONES_PER_OCTAVE * octave as usize;
        u8::try_from(pitch).ok().filter(|p| *p <= 127)
    }
}
impl Instrument for RelayInstrument {
    fn name(&self) -> &str {
        &self.name
    }

    fn octaves(&self) -> Octave {
        self.settings.octaves
    }

    fn initial_octave(&self) -> Octave {
        self.settings.initial_octave
    }

    fn select(&mut self, _: &mut AudioDevice) -> Result<Status> {
        self.client.connect()?;
        self.is_selected = true;
        self.select_patch(self.patch)?;
        Ok(Status::none())
    }

    fn deselect(&mut self, _: &mut AudioDevice) {
        if self.is_selected {
            self.client.disconnect();
            self.is_selected = false;
        }
    }

    fn note_on(&mut self, _: &mut AudioDevice, channel: Channel, octave: Octave) -> Result<Status> {
        let Some(pitch) = Self::pitch(channel, octave).filter(|_| self.is_selected) else {
            return Ok(Status::empty());
        };
        self.send(MidiMessage::NoteOn {
            key: u7::from(pitch),
            vel: u7::from(self.settings.velocity),
        })?;
        Ok(Status::message(format!("on {pitch}")))
    }

    fn note_off(&mut self, _: &mut AudioDevice, channel: Channel, octave: Octave) -> Result<Status> {
        let Some(pitch) = Self::pitch(channel, octave).filter(|_| self.is_selected) else {
            return Ok(Status::empty());
        };
        self.send(MidiMessage::NoteOff {
            key: u7::from(pitch),
            vel: u7::from(self.settings.release_velocity),
        })?;
        Ok(Status::message(format!("off {pitch}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_on(key: u8, vel: u8) -> LiveEvent<'static> {
        LiveEvent::Midi {
            channel: u4::from(0),
            message: MidiMessage::NoteOn {
                key: u7::from(key),
                vel: u7::from(vel),
            },
        }
    }

    fn note_off(key: u8, vel: u8) -> LiveEvent<'static> {
        LiveEvent::Midi {
            channel: u4::from(0),
            message: MidiMessage::NoteOff {
                key: u7::from(key),
                vel: u7::from(vel),
            },
        }
    }

    fn program(patch: u8) -> LiveEvent<'static> {
        LiveEvent::Midi {
            channel: u4::from(0),
            message: MidiMessage::ProgramChange {
                program: u7::from(patch),
            },
        }
    }

    fn relay() -> (RelayInstrument, RecordingRelayClient) {
        let client = RecordingRelayClient::default();
        let relay = RelayInstrument::new_with(
            "yoshimi",
            Box::new(client.clone()),
            RelaySettings::default(),
        );
        (relay, client)
    }

    #[test]
    fn defaults() {
        let (relay, client) = relay();
        assert_eq!(relay.name(), "MIDI:yoshimi");
        assert_eq!(relay.octaves(), 10);
        assert_eq!(relay.initial_octave(), 5);
        assert_eq!(relay.patch(), 1);
        assert!(!client.is_connected());
    }

    #[test]
    fn forwards_events_in_order() {
        let (mut relay, client) = relay();
        let mut device = AudioDevice::new_null();
        assert_eq!(relay.select(&mut device).unwrap(), Status::none());
        assert!(client.is_connected());
        assert!(!device.is_open());

        assert_eq!(relay.note_on(&mut device, 0, 5).unwrap().text(), Some("on 60"));
        assert_eq!(relay.note_on(&mut device, 4, 5).unwrap().text(), Some("on 64"));
        assert_eq!(relay.note_off(&mut device, 0, 5).unwrap().text(), Some("off 60"));
        assert_eq!(relay.note_off(&mut device, 4, 5).unwrap().text(), Some("off 64"));
        assert_eq!(
            client.events(),
            vec![
                program(1),
                note_on(60, 100),
                note_on(64, 100),
                note_off(60, 100),
                note_off(64, 100)
            ]
        );

        relay.deselect(&mut device);
        assert!(!client.is_connected());
        relay.deselect(&mut device);
    }

    #[test]
    fn patch_bounds() {
        let (mut relay, client) = relay();
        let mut device = AudioDevice::new_null();
        relay.select(&mut device).unwrap();
        relay.select_patch(16).unwrap();
        assert_eq!(relay.patch(), 1);
        relay.select_patch(15).unwrap();
        relay.select_patch(0).unwrap();
        assert_eq!(relay.patch(), 0);
        assert_eq!(client.events(), vec![program(1), program(15), program(0)]);

        let settings = RelaySettings {
            patch: 16,
            ..Default::default()
        };
        let recorder = RecordingRelayClient::default();
        let mut out_of_range =
            RelayInstrument::new_with("x", Box::new(recorder.clone()), settings);
        out_of_range.select(&mut device).unwrap();
        assert!(recorder.events().is_empty(), "no program change for patch 16");
    }

    #[test]
    fn unrepresentable_pitches_send_nothing() {
        let (mut relay, client) = relay();
        let mut device = AudioDevice::new_null();
        relay.select(&mut device).unwrap();
        assert_eq!(relay.note_on(&mut device, 7, 10).unwrap().text(), Some("on 127"));
        assert!(relay.note_on(&mut device, 8, 10).unwrap().is_empty());
        assert!(relay.note_off(&mut device, 12, 10).unwrap().is_empty());
        assert_eq!(client.events().len(), 2);
    }

    #[test]
    fn release_velocity_is_configurable() {
        let client = RecordingRelayClient::default();
        let settings = RelaySettings {
            release_velocity: 0,
            midi_channel: 3,
            ..Default::default()
        };
        let mut relay = RelayInstrument::new_with("SunVox", Box::new(client.clone()), settings);
        let mut device = AudioDevice::new_null();
        relay.select(&mut device).unwrap();
        relay.note_off(&mut device, 0, 0).unwrap();
        assert_eq!(
            client.events().last(),
            Some(&LiveEvent::Midi {
                channel: u4::from(3),
                message: MidiMessage::NoteOff {
                    key: u7::from(0),
                    vel: u7::from(0),
                },
            })
        );
    }

    #[test]
    fn notes_before_select_are_ignored() {
        let (mut relay, client) = relay();
        let mut device = AudioDevice::new_null();
        assert!(relay.note_on(&mut device, 0, 5).unwrap().is_empty());
        assert_eq!(client.connect_count(), 0);
    }
}

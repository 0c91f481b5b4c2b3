// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{Instrument, Status, ToggleChange};
use crate::{
    audio::{single_cycle_clip, AudioDevice, Clip, Playback, Waveform},
    settings::SynthSettings,
    types::{key_name, Channel, Octave, TOP_CHANNEL},
    util::ToggleSet,
    Result,
};
use std::{sync::Arc, time::Duration};
use strum::IntoEnumIterator;

/// A crude chiptune synth. Each note layers up to three single-cycle
/// waveforms, and the player switches the layers on and off from the
/// keyboard: the top C toggles sine, octave-up toggles saw, and octave-down
/// toggles square.
#[derive(Debug)]
pub struct SynthInstrument {
    settings: SynthSettings,
    enabled: ToggleSet<Waveform>,

    /// One clip per note channel for each waveform, built on select.
    notes: Vec<(Waveform, Vec<Arc<Clip>>)>,
}
impl Default for SynthInstrument {
    fn default() -> Self {
        Self::new_with(SynthSettings::default())
    }
}
impl SynthInstrument {
    /// Shown when the synth is selected.
    pub const HELP: &'static str = "C2=sine,v=square,^saw";

    #[allow(missing_docs)]
    pub fn new_with(settings: SynthSettings) -> Self {
        Self {
            settings,
            enabled: Default::default(),
            notes: Default::default(),
        }
    }

    /// The controller key whose indicator shows a waveform's state.
    pub fn indicator_key(kind: Waveform) -> Channel {
        match kind {
            Waveform::Sine => TOP_CHANNEL,
            Waveform::Square => TOP_CHANNEL + 1,
            Waveform::Saw => TOP_CHANNEL + 2,
        }
    }

    /// Whether a waveform is currently layered into new notes.
    pub fn is_enabled(&self, kind: Waveform) -> bool {
        self.enabled.get(&kind)
    }

    fn toggle(&mut self, kind: Waveform) -> Status {
        let enabled = self.enabled.toggle(kind);
        Status::message(format!("{kind} {}", if enabled { "on" } else { "off" })).with_toggle(
            ToggleChange {
                kind,
                key: Self::indicator_key(kind),
                enabled,
            },
        )
    }

    fn build_notes(&mut self, stereo: bool) {
        let device = &self.settings.device;
        self.notes = Waveform::iter()
            .map(|kind| {
                let volume = self.settings.volumes.get(kind);
                let clips = self
                    .settings
                    .frequencies
                    .iter()
                    .map(|frequency| {
                        Arc::new(
                            single_cycle_clip(
                                kind,
                                *frequency,
                                device.sample_rate,
                                device.bit_depth,
                                stereo,
                            )
                            .with_volume(volume),
                        )
                    })
                    .collect();
                (kind, clips)
            })
            .collect();
    }
}
impl Instrument for SynthInstrument {
    fn name(&self) -> &str {
        "8BitSynth"
    }

    fn octaves(&self) -> Octave {
        0
    }

    fn initial_octave(&self) -> Octave {
        0
    }

    fn select(&mut self, device: &mut AudioDevice) -> Result<Status> {
        self.enabled = Default::default();
        device.open(self.settings.device)?;
        let stereo = device.config().is_some_and(|c| c.channels > 1);
        self.build_notes(stereo);
        let toggle = self.toggle(Waveform::Sine).toggle;
        let mut status = Status::message(Self::HELP);
        status.toggle = toggle;
        Ok(status)
    }

    fn deselect(&mut self, device: &mut AudioDevice) {
        device.stop_all();
        device.close();
        self.enabled = Default::default();
        self.notes.clear();
    }

    fn note_on(&mut self, device: &mut AudioDevice, channel: Channel, _: Octave) -> Result<Status> {
        if channel == TOP_CHANNEL {
            return Ok(self.toggle(Waveform::Sine));
        }
        let Some(mut message) = key_name(channel)
            .filter(|_| channel < TOP_CHANNEL)
            .map(|k| k.to_string())
        else {
            return Ok(Status::empty());
        };
        let attack = Duration::from_millis(self.settings.attack_ms);
        for (kind, clips) in self.notes.iter() {
            if !self.enabled.get(kind) {
                continue;
            }
            message.push(' ');
            message.push_str(&kind.to_string());
            if let Some(clip) = clips.get(channel as usize) {
                device.stop_clip(clip.id());
                device.play(clip, Playback::sustained(attack));
            }
        }
        Ok(Status::message(message))
    }

    fn note_off(&mut self, device: &mut AudioDevice, channel: Channel, _: Octave) -> Result<Status> {
        if channel >= TOP_CHANNEL {
            return Ok(Status::none());
        }
        let release = Duration::from_millis(self.settings.release_ms);
        for (_, clips) in self.notes.iter() {
            if let Some(clip) = clips.get(channel as usize) {
                device.fade_out_clip(clip.id(), release);
            }
        }
        Ok(Status::none())
    }

    fn octave_up(&mut self, _: &mut AudioDevice, _: Octave) -> Result<Status> {
        Ok(self.toggle(Waveform::Saw))
    }

    fn octave_down(&mut self, _: &mut AudioDevice, _: Octave) -> Result<Status> {
        Ok(self.toggle(Waveform::Square))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected() -> (SynthInstrument, AudioDevice) {
        let mut device = AudioDevice::new_null();
        let mut synth = SynthInstrument::default();
        let status = synth.select(&mut device).unwrap();
        assert_eq!(status.text(), Some(SynthInstrument::HELP));
        assert_eq!(
            status.toggle,
            Some(ToggleChange {
                kind: Waveform::Sine,
                key: 12,
                enabled: true
            })
        );
        (synth, device)
    }

    #[test]
    fn select_opens_device_and_enables_sine() {
        let (synth, device) = selected();
        let config = device.config().unwrap();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.channels, 1);
        assert_eq!(config.buffer_size, 1024);
        assert!(synth.is_enabled(Waveform::Sine));
        assert!(!synth.is_enabled(Waveform::Saw));
        assert!(!synth.is_enabled(Waveform::Square));
        assert_eq!(synth.notes.iter().map(|(_, c)| c.len()).sum::<usize>(), 39);
    }

    #[test]
    fn top_key_toggles_sine_without_sound() {
        let (mut synth, mut device) = selected();
        let status = synth.note_on(&mut device, 12, 0).unwrap();
        assert_eq!(status.text(), Some("sine off"));
        assert!(!status.toggle.unwrap().enabled);
        assert_eq!(device.voice_count(), 0);
        assert_eq!(synth.note_off(&mut device, 12, 0).unwrap(), Status::none());
        assert_eq!(device.voice_count(), 0);
        assert_eq!(synth.note_on(&mut device, 12, 0).unwrap().text(), Some("sine on"));
        assert_eq!(device.voice_count(), 0);
    }

    #[test]
    fn octave_keys_toggle_saw_and_square_independently() {
        let (mut synth, mut device) = selected();
        let status = synth.octave_up(&mut device, 0).unwrap();
        assert_eq!(status.text(), Some("saw on"));
        assert_eq!(status.toggle.unwrap().key, 14);
        assert_eq!(synth.octave_down(&mut device, 0).unwrap().text(), Some("square on"));
        assert!(synth.is_enabled(Waveform::Sine));

        synth.note_on(&mut device, 12, 0).unwrap();
        assert!(!synth.is_enabled(Waveform::Sine));
        assert!(synth.is_enabled(Waveform::Saw));
        assert!(synth.is_enabled(Waveform::Square));
    }

    #[test]
    fn notes_play_enabled_layers() {
        let (mut synth, mut device) = selected();
        assert_eq!(synth.note_on(&mut device, 2, 0).unwrap().text(), Some("D sine"));
        assert_eq!(device.voice_count(), 1);

        synth.octave_up(&mut device, 0).unwrap();
        assert_eq!(
            synth.note_on(&mut device, 2, 0).unwrap().text(),
            Some("D sine saw"),
            "Retriggering should restart the sine voice, not stack another."
        );
        assert_eq!(device.voice_count(), 2);

        synth.note_off(&mut device, 2, 0).unwrap();
        let mut out = vec![0.0; 44100];
        device.render(&mut out);
        assert_eq!(device.voice_count(), 0, "the release fade should have finished");
    }

    #[test]
    fn deselect_resets_everything() {
        let (mut synth, mut device) = selected();
        synth.octave_up(&mut device, 0).unwrap();
        synth.note_on(&mut device, 0, 0).unwrap();
        synth.deselect(&mut device);
        assert!(!device.is_open());
        assert!(!synth.is_enabled(Waveform::Saw));
        assert!(!synth.is_enabled(Waveform::Sine));
        synth.deselect(&mut device);

        assert_eq!(synth.note_on(&mut device, 0, 0).unwrap().text(), Some("C"));
    }
}

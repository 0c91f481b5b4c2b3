// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Structs that hold configuration information about various parts of the
//! system. Intended to be deserialized from a JSON file; every field has a
//! default, so a file only needs to mention what it changes.

use crate::{
    audio::{BitDepth, DeviceConfig, Waveform},
    types::Octave,
    Error, Result,
};
use derivative::Derivative;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Playback gain for each synth waveform.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct WaveformVolumes {
    #[allow(missing_docs)]
    #[derivative(Default(value = "0.15"))]
    pub sine: f32,
    #[allow(missing_docs)]
    #[derivative(Default(value = "0.15"))]
    pub saw: f32,
    #[allow(missing_docs)]
    #[derivative(Default(value = "1.0"))]
    pub square: f32,
}
impl WaveformVolumes {
    /// The gain for one waveform.
    pub fn get(&self, waveform: Waveform) -> f32 {
        match waveform {
            Waveform::Sine => self.sine,
            Waveform::Saw => self.saw,
            Waveform::Square => self.square,
        }
    }
}

/// The device fields a settings file may change. Whatever it leaves out
/// keeps the owning instrument's default, not [DeviceConfig]'s.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct DeviceOverrides {
    sample_rate: Option<u32>,
    bit_depth: Option<BitDepth>,
    channels: Option<u16>,
    buffer_size: Option<u32>,
    max_voices: Option<usize>,
}
impl DeviceOverrides {
    fn apply(self, base: DeviceConfig) -> DeviceConfig {
        DeviceConfig {
            sample_rate: self.sample_rate.unwrap_or(base.sample_rate),
            bit_depth: self.bit_depth.unwrap_or(base.bit_depth),
            channels: self.channels.unwrap_or(base.channels),
            buffer_size: self.buffer_size.unwrap_or(base.buffer_size),
            max_voices: self.max_voices.unwrap_or(base.max_voices),
        }
    }

    fn merge<'de, D: Deserializer<'de>>(
        deserializer: D,
        base: DeviceConfig,
    ) -> std::result::Result<DeviceConfig, D::Error> {
        Self::deserialize(deserializer).map(|overrides| overrides.apply(base))
    }
}

/// Settings for the waveform synth.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct SynthSettings {
    /// The device config the synth opens.
    #[derivative(Default(value = "Self::default_device()"))]
    #[serde(deserialize_with = "SynthSettings::merge_device")]
    pub device: DeviceConfig,
    /// Fade-in on every note, in milliseconds.
    #[derivative(Default(value = "25"))]
    pub attack_ms: u64,
    /// Fade-out on release, in milliseconds.
    #[derivative(Default(value = "500"))]
    pub release_ms: u64,
    #[allow(missing_docs)]
    pub volumes: WaveformVolumes,
    /// One pitch per note channel, in Hertz.
    #[derivative(Default(value = "Self::default_frequencies()"))]
    pub frequencies: Vec<f64>,
}
impl SynthSettings {
    fn merge_device<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<DeviceConfig, D::Error> {
        DeviceOverrides::merge(d, Self::default_device())
    }

    fn default_device() -> DeviceConfig {
        DeviceConfig {
            sample_rate: 44100,
            bit_depth: BitDepth::Eight,
            channels: 1,
            buffer_size: 1024,
            max_voices: 8,
        }
    }

    fn default_frequencies() -> Vec<f64> {
        vec![
            261.626, 277.183, 293.665, 311.127, 329.628, 349.228, 369.994, 391.995, 415.305,
            440.000, 466.164, 493.883, 523.251,
        ]
    }
}

/// Settings for folders of short samples.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct SamplerSettings {
    #[allow(missing_docs)]
    #[derivative(Default(value = "Self::default_device()"))]
    #[serde(deserialize_with = "SamplerSettings::merge_device")]
    pub device: DeviceConfig,
    /// Which files in a folder count as samples.
    #[derivative(Default(value = "vec![\"*.wav\".to_string(), \"*.ogg\".to_string()]"))]
    pub patterns: Vec<String>,
    /// Extra repeats after the first play. Negative loops forever.
    pub loops: i32,
}
impl SamplerSettings {
    fn merge_device<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<DeviceConfig, D::Error> {
        DeviceOverrides::merge(d, Self::default_device())
    }

    fn default_device() -> DeviceConfig {
        DeviceConfig {
            sample_rate: 44100,
            bit_depth: BitDepth::Sixteen,
            channels: 1,
            buffer_size: 512,
            max_voices: 32,
        }
    }
}

/// Settings for folders of long tracks whose playback rate follows the octave.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct TrackSettings {
    #[allow(missing_docs)]
    #[derivative(Default(value = "vec![\"*.mp3\".to_string()]"))]
    pub patterns: Vec<String>,
    #[allow(missing_docs)]
    #[derivative(Default(value = "10"))]
    pub octaves: Octave,
    #[allow(missing_docs)]
    #[derivative(Default(value = "4"))]
    pub initial_octave: Octave,
    /// Octave `n` runs the device at `rate_step * (n + 1)` Hz.
    #[derivative(Default(value = "4411"))]
    pub rate_step: u32,
    /// Device shape on select. Its sample rate is replaced by the rate for
    /// the initial octave.
    #[derivative(Default(value = "Self::default_select_device()"))]
    #[serde(deserialize_with = "TrackSettings::merge_select_device")]
    pub select_device: DeviceConfig,
    /// Device shape after an octave change. Its sample rate is replaced too.
    #[derivative(Default(value = "Self::default_reinit_device()"))]
    #[serde(deserialize_with = "TrackSettings::merge_reinit_device")]
    pub reinit_device: DeviceConfig,
    /// Extra repeats after the first play. Negative loops forever.
    pub loops: i32,
}
impl TrackSettings {
    fn merge_select_device<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<DeviceConfig, D::Error> {
        DeviceOverrides::merge(d, Self::default_select_device())
    }

    fn merge_reinit_device<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<DeviceConfig, D::Error> {
        DeviceOverrides::merge(d, Self::default_reinit_device())
    }

    fn default_select_device() -> DeviceConfig {
        DeviceConfig {
            sample_rate: 4411 * 5,
            bit_depth: BitDepth::Sixteen,
            channels: 2,
            buffer_size: 2048,
            max_voices: 32,
        }
    }

    fn default_reinit_device() -> DeviceConfig {
        DeviceConfig {
            sample_rate: 4411 * 5,
            bit_depth: BitDepth::Sixteen,
            channels: 1,
            buffer_size: 512,
            max_voices: 32,
        }
    }

    /// The device rate for an octave.
    pub fn rate_for(&self, octave: Octave) -> u32 {
        self.rate_step.saturating_mul(octave as u32 + 1)
    }
}

/// Settings for instruments that forward notes to external MIDI clients.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct RelaySettings {
    #[allow(missing_docs)]
    #[derivative(Default(value = "10"))]
    pub octaves: Octave,
    #[allow(missing_docs)]
    #[derivative(Default(value = "5"))]
    pub initial_octave: Octave,
    /// Program sent when the instrument is selected.
    #[derivative(Default(value = "1"))]
    pub patch: u8,
    /// Number of valid programs; patches must be below this.
    #[derivative(Default(value = "16"))]
    pub banks: u8,
    /// MIDI channel (0-15) that notes go out on.
    pub midi_channel: u8,
    /// Note-on velocity.
    #[derivative(Default(value = "100"))]
    pub velocity: u8,
    /// Note-off velocity.
    #[derivative(Default(value = "100"))]
    pub release_velocity: u8,
    /// Clients that are never offered as instruments.
    #[derivative(Default(value = "Self::default_ignore()"))]
    pub ignore: Vec<String>,
    /// Clients known to work. Others get a warning.
    #[derivative(Default(value = "Self::default_allow()"))]
    pub allow: Vec<String>,
    /// Whether clients on neither list are registered anyway.
    #[derivative(Default(value = "true"))]
    pub load_unknown: bool,
}
impl RelaySettings {
    fn default_ignore() -> Vec<String> {
        ["__sequencer__", "System", "Midi Through"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn default_allow() -> Vec<String> {
        ["yoshimi", "SunVox", "CH345"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// Settings for the input side.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct ControllerSettings {
    /// Terminal keys for note channels 0, 1, 2, ... in order.
    #[derivative(Default(value = "\"zsxdcvgbhnjm,\".to_string()"))]
    pub note_keys: String,
    #[allow(missing_docs)]
    #[derivative(Default(value = "'l'"))]
    pub octave_down_key: char,
    #[allow(missing_docs)]
    #[derivative(Default(value = "'o'"))]
    pub octave_up_key: char,
    #[allow(missing_docs)]
    #[derivative(Default(value = "'i'"))]
    pub instrument_key: char,
    /// On terminals that only report presses, how long a key stays down
    /// after its last auto-repeat, in milliseconds. Longer than the usual
    /// auto-repeat delay.
    #[derivative(Default(value = "600"))]
    pub key_hold_ms: u64,
    /// Name (or part of the name) of a MIDI input port to use as a hardware
    /// controller. None means keyboard only.
    pub midi_port: Option<String>,
    /// The MIDI note that maps to channel 0.
    #[derivative(Default(value = "60"))]
    pub base_note: u8,
    /// Control-change numbers that act as the function keys.
    #[derivative(Default(value = "102"))]
    pub octave_down_cc: u8,
    #[allow(missing_docs)]
    #[derivative(Default(value = "103"))]
    pub octave_up_cc: u8,
    #[allow(missing_docs)]
    #[derivative(Default(value = "104"))]
    pub instrument_cc: u8,
}

/// Everything configurable, in one file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    #[allow(missing_docs)]
    pub synth: SynthSettings,
    #[allow(missing_docs)]
    pub sampler: SamplerSettings,
    #[allow(missing_docs)]
    pub tracks: TrackSettings,
    #[allow(missing_docs)]
    pub relay: RelaySettings,
    #[allow(missing_docs)]
    pub controller: ControllerSettings,
}
impl Settings {
    /// Reads settings from a JSON file. A missing file means all defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).map_err(|source| Error::Settings {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no settings at {path:?}; using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[allow(missing_docs)]
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_instruments() {
        let settings = Settings::default();
        assert_eq!(settings.synth.device.sample_rate, 44100);
        assert_eq!(settings.synth.device.bit_depth, BitDepth::Eight);
        assert_eq!(settings.synth.device.buffer_size, 1024);
        assert_eq!(settings.synth.frequencies.len(), 13);
        assert_eq!(settings.synth.volumes.get(Waveform::Square), 1.0);
        assert_eq!(settings.sampler.device.max_voices, 32);
        assert_eq!(settings.sampler.patterns, vec!["*.wav", "*.ogg"]);
        assert_eq!(settings.tracks.rate_for(4), 22055);
        assert_eq!(settings.tracks.rate_for(6), 30877);
        assert_eq!(settings.tracks.select_device.channels, 2);
        assert_eq!(settings.relay.velocity, 100);
        assert_eq!(settings.relay.release_velocity, 100);
        assert!(settings.relay.ignore.contains(&"Midi Through".to_string()));
        assert_eq!(settings.controller.note_keys.chars().count(), 13);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let settings = Settings::from_json(
            r#"{
                "sampler": { "loops": -1, "device": { "bit-depth": 8 } },
                "relay": { "release-velocity": 64, "allow": ["fluidsynth"] }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.sampler.loops, -1);
        assert_eq!(settings.sampler.device.bit_depth, BitDepth::Eight);
        assert_eq!(settings.sampler.device.sample_rate, 44100);
        assert_eq!(settings.relay.release_velocity, 64);
        assert_eq!(settings.relay.velocity, 100);
        assert_eq!(settings.relay.allow, vec!["fluidsynth"]);
        assert_eq!(settings.synth, SynthSettings::default());
    }

    #[test]
    fn partial_device_keeps_the_instruments_own_defaults() {
        let settings = Settings::from_json(
            r#"{
                "synth": { "device": { "max-voices": 16 } },
                "tracks": { "reinit-device": { "channels": 2 } }
            }"#,
        )
        .unwrap();
        let synth = settings.synth.device;
        assert_eq!(synth.max_voices, 16);
        assert_eq!(synth.bit_depth, BitDepth::Eight);
        assert_eq!(synth.buffer_size, 1024);
        assert_eq!(synth.sample_rate, 44100);

        let reinit = settings.tracks.reinit_device;
        assert_eq!(reinit.channels, 2);
        assert_eq!(reinit.buffer_size, 512);
        assert_eq!(settings.tracks.select_device.buffer_size, 2048);

        assert!(
            Settings::from_json(r#"{ "synth": { "device": { "bit-depth": 12 } } }"#).is_err()
        );
    }

    #[test]
    fn load_handles_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(Settings::load(&missing).unwrap(), Settings::default());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(Settings::load(&bad), Err(Error::Settings { .. })));
    }
}

// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{Clip, ClipId, Mixer, Playback, VoiceId};
use crate::{Error, Result};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Resolution of each output sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitDepth {
    #[allow(missing_docs)]
    Eight,
    #[allow(missing_docs)]
    #[default]
    Sixteen,
}
impl BitDepth {
    /// Number of bits per sample.
    pub fn bits(&self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }
}
impl TryFrom<u8> for BitDepth {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            _ => Err(format!("unsupported bit depth {value}; expected 8 or 16")),
        }
    }
}
impl From<BitDepth> for u8 {
    fn from(value: BitDepth) -> Self {
        value.bits() as u8
    }
}

/// What an instrument asks the device for when it opens it.
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct DeviceConfig {
    /// The logical rate, in Hertz.
    #[derivative(Default(value = "44100"))]
    pub sample_rate: u32,
    #[allow(missing_docs)]
    pub bit_depth: BitDepth,
    /// 1 for mono, 2 for stereo.
    #[derivative(Default(value = "1"))]
    pub channels: u16,
    /// Period size, in frames.
    #[derivative(Default(value = "512"))]
    pub buffer_size: u32,
    /// How many voices may sound at once.
    #[derivative(Default(value = "32"))]
    pub max_voices: usize,
}

/// The mixer as shared between the device and a backend's audio thread.
pub type SharedMixer = Arc<Mutex<Mixer>>;

/// Something that can pull frames from a [Mixer] and deliver them to
/// hardware.
pub trait AudioBackend: Debug {
    /// Starts delivering audio. The backend must tell the mixer its real
    /// output format with [Mixer::set_output_format] before it renders.
    fn start(&mut self, config: &DeviceConfig, mixer: SharedMixer) -> Result<()>;

    /// Stops delivering audio and releases the hardware. Calling this when
    /// nothing is running is harmless.
    fn stop(&mut self);
}

/// A backend that produces no sound. The mixer still runs whenever someone
/// calls [AudioDevice::render], which is how tests listen to it.
#[derive(Debug, Default)]
pub struct NullBackend {
    is_running: bool,
}
impl AudioBackend for NullBackend {
    fn start(&mut self, config: &DeviceConfig, mixer: SharedMixer) -> Result<()> {
        if let Ok(mut mixer) = mixer.lock() {
            mixer.set_output_format(config.sample_rate, config.channels);
        }
        self.is_running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.is_running = false;
    }
}

/// The single audio output. Whichever instrument is active borrows it; nobody
/// else can reach it.
///
/// Opening the device creates a fresh [Mixer] for the requested config and
/// hands it to the backend. Each open bumps [AudioDevice::generation], so
/// callers can tell when the hardware was torn down and rebuilt.
#[derive(Debug)]
pub struct AudioDevice {
    backend: Box<dyn AudioBackend>,
    mixer: Option<SharedMixer>,
    config: Option<DeviceConfig>,
    generation: usize,
}
impl AudioDevice {
    #[allow(missing_docs)]
    pub fn new_with(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            mixer: None,
            config: None,
            generation: 0,
        }
    }

    /// A device that never touches hardware.
    pub fn new_null() -> Self {
        Self::new_with(Box::<NullBackend>::default())
    }

    /// Opens the device with `config`, closing it first if it's already open.
    pub fn open(&mut self, config: DeviceConfig) -> Result<()> {
        if self.is_open() {
            self.close();
        }
        let mixer = Arc::new(Mutex::new(Mixer::new_with(
            config.sample_rate,
            config.channels,
            config.bit_depth,
            config.max_voices,
        )));
        self.backend.start(&config, Arc::clone(&mixer)).map_err(|e| match e {
            Error::Device(_) => e,
            e => Error::Device(e.to_string()),
        })?;
        log::debug!("audio device open: {config:?}");
        self.mixer = Some(mixer);
        self.config = Some(config);
        self.generation += 1;
        Ok(())
    }

    /// Silences everything and releases the hardware. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mixer) = self.mixer.take() {
            if let Ok(mut mixer) = mixer.lock() {
                mixer.stop_all();
            }
            self.backend.stop();
            log::debug!("audio device closed");
        }
        self.config = None;
    }

    /// Tears the device down and brings it back up with a different config.
    ///
    /// This blocks until the new stream is running. Every voice from the old
    /// configuration is gone when it returns.
    pub fn reinitialize(&mut self, config: DeviceConfig) -> Result<()> {
        self.stop_all();
        self.close();
        self.open(config)
    }

    #[allow(missing_docs)]
    pub fn is_open(&self) -> bool {
        self.mixer.is_some()
    }

    /// The config the device was last opened with, if it's open.
    pub fn config(&self) -> Option<&DeviceConfig> {
        self.config.as_ref()
    }

    /// Counts how many times the device has been opened.
    pub fn generation(&self) -> usize {
        self.generation
    }

    fn with_mixer<R>(&self, f: impl FnOnce(&mut Mixer) -> R) -> Option<R> {
        self.mixer
            .as_ref()
            .and_then(|mixer| mixer.lock().ok().map(|mut mixer| f(&mut mixer)))
    }

    /// Starts a voice. Returns None if the device is closed or the mixer had
    /// no free voice.
    pub fn play(&self, clip: &Arc<Clip>, playback: Playback) -> Option<VoiceId> {
        self.with_mixer(|m| m.play(clip, playback)).flatten()
    }

    #[allow(missing_docs)]
    pub fn fade_out_clip(&self, clip_id: ClipId, duration: Duration) {
        self.with_mixer(|m| m.fade_out_clip(clip_id, duration));
    }

    #[allow(missing_docs)]
    pub fn stop_clip(&self, clip_id: ClipId) {
        self.with_mixer(|m| m.stop_clip(clip_id));
    }

    #[allow(missing_docs)]
    pub fn stop_all(&self) {
        self.with_mixer(|m| m.stop_all());
    }

    #[allow(missing_docs)]
    pub fn voice_count(&self) -> usize {
        self.with_mixer(|m| m.voice_count()).unwrap_or_default()
    }

    #[allow(missing_docs)]
    pub fn is_playing(&self, clip_id: ClipId) -> bool {
        self.with_mixer(|m| m.is_playing(clip_id)).unwrap_or_default()
    }

    /// The voices currently sounding, oldest first.
    pub fn voice_ids(&self) -> Vec<VoiceId> {
        self.with_mixer(|m| m.voice_ids()).unwrap_or_default()
    }

    /// Pulls frames straight from the mixer. A closed device renders silence.
    pub fn render(&self, output: &mut [f32]) {
        match self.mixer.as_ref().and_then(|mixer| mixer.lock().ok()) {
            Some(mut mixer) => mixer.render(output),
            None => output.fill(0.0),
        }
    }
}
impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.close();
    }
}

// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Clips, voices, and the one audio device they play through.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        AudioBackend, AudioDevice, BitDepth, Clip, ClipId, CpalBackend, DeviceConfig, Looping,
        NullBackend, Playback, VoiceId, Waveform,
    };
}

pub use clip::{Clip, ClipId};
pub use cpal_backend::CpalBackend;
pub use device::{AudioBackend, AudioDevice, BitDepth, DeviceConfig, NullBackend, SharedMixer};
pub use mixer::{Looping, Mixer, Playback, VoiceId};
pub use waveform::{
    max_amplitude, period_length, sample, single_cycle, single_cycle_clip, Waveform,
};

mod clip;
mod cpal_backend;
mod device;
mod mixer;
mod waveform;

// Copyright (c) 2024 Mike Tsao. All rights reserved.

use crate::{util::file_name, Error, Result};
use derive_more::Display;
use std::{
    fs::File,
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

/// Identifies a [Clip] for as long as the process runs. Every voice that plays
/// a clip can be addressed through the clip's id.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub struct ClipId(usize);
impl ClipId {
    fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An immutable block of audio. Samples are interleaved and normalized to
/// -1.0..=1.0. Clips are shared behind an `Arc`, so one clip can be played by
/// many voices at once.
#[derive(Debug)]
pub struct Clip {
    id: ClipId,
    name: String,
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
    volume: f32,
}
impl Clip {
    /// Wraps already-decoded samples. `channels` must be at least 1.
    pub fn new_with(name: &str, sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            id: ClipId::next(),
            name: name.to_string(),
            sample_rate,
            channels: channels.max(1),
            samples,
            volume: 1.0,
        }
    }

    /// Sets the gain the mixer applies whenever this clip plays.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Decodes a whole file into memory.
    pub fn load(path: &Path) -> Result<Self> {
        let asset_error = |reason: String| Error::Asset {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| asset_error(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| asset_error(format!("unrecognized format: {e}")))?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| asset_error("no audio track".to_string()))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| asset_error("missing sample rate".to_string()))?;
        let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| asset_error(format!("no decoder: {e}")))?;

        let mut samples = Vec::default();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(asset_error(e.to_string())),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels = spec.channels.count();
                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    log::debug!("skipping undecodable packet in {path:?}: {e}");
                }
                Err(e) => return Err(asset_error(e.to_string())),
            }
        }
        if samples.is_empty() {
            return Err(asset_error("no audio data".to_string()));
        }

        Ok(Self::new_with(
            &file_name(path),
            sample_rate,
            channels as u16,
            samples,
        ))
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> ClipId {
        self.id
    }

    /// Usually the file name the clip came from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rate the samples were recorded or generated at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[allow(missing_docs)]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    #[allow(missing_docs)]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// The raw interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of frames (one sample per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// The sample that output channel `channel` of an `out_channels`-wide
    /// stream should hear at `frame`. Mono clips feed every output channel;
    /// wider clips are averaged down to a mono output.
    pub fn sample_for(&self, frame: usize, channel: usize, out_channels: usize) -> f32 {
        let width = self.channels as usize;
        let base = frame * width;
        if base + width > self.samples.len() {
            return 0.0;
        }
        if width == 1 {
            self.samples[base]
        } else if out_channels == 1 {
            self.samples[base..base + width].iter().sum::<f32>() / width as f32
        } else {
            self.samples[base + channel.min(width - 1)]
        }
    }
}

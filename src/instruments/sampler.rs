// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{Instrument, Status};
use crate::{
    audio::{AudioDevice, Clip, Playback},
    settings::SamplerSettings,
    types::{Channel, Octave, SEMITONES_PER_OCTAVE},
    util::{file_name, matching_files, FilePattern},
    Result,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// The audio files found in one folder, in natural order. Slot `n` is the
/// `n`th file.
#[derive(Clone, Debug, Default)]
pub struct SampleFiles {
    folder: PathBuf,
    files: Vec<PathBuf>,
}
impl SampleFiles {
    /// Lists the files in `folder` that match any of `patterns`.
    pub fn scan(folder: &Path, patterns: &[String]) -> Self {
        let patterns: Vec<FilePattern> = patterns.iter().map(|p| FilePattern::new(p)).collect();
        Self {
            folder: folder.to_path_buf(),
            files: matching_files(folder, &patterns),
        }
    }

    /// The last component of the folder's path.
    pub fn folder_name(&self) -> String {
        file_name(&self.folder)
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The file in a slot.
    pub fn get(&self, slot: usize) -> Option<&Path> {
        self.files.get(slot).map(|p| p.as_path())
    }

    #[allow(missing_docs)]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Plays short samples from a folder. Files are laid out twelve to an octave,
/// so the first file is C in octave 0, the thirteenth is C in octave 1, and
/// so on.
#[derive(Debug)]
pub struct SamplePlayerInstrument {
    name: String,
    settings: SamplerSettings,
    files: SampleFiles,
    octaves: Octave,
    initial_octave: Octave,

    /// Decoded on select, dropped on deselect.
    samples: Vec<Arc<Clip>>,
}
impl SamplePlayerInstrument {
    /// Scans `folder` for samples. Nothing is decoded until select.
    pub fn new_with(folder: &Path, settings: SamplerSettings) -> Self {
        let files = SampleFiles::scan(folder, &settings.patterns);
        let octaves = (files.len() / SEMITONES_PER_OCTAVE).min(Octave::MAX as usize) as Octave;
        Self {
            name: format!("WavPlayer:{}", files.folder_name()),
            settings,
            files,
            octaves,
            initial_octave: octaves / 2,
            samples: Default::default(),
        }
    }

    #[allow(missing_docs)]
    pub fn files(&self) -> &SampleFiles {
        &self.files
    }

    /// The sample slot a key maps to.
    pub fn slot(channel: Channel, octave: Octave) -> usize {
        channel as usize + SEMITONES_PER_OCTAVE * octave as usize
    }
}
impl Instrument for SamplePlayerInstrument {
    fn name(&self) -> &str {
        &self.name
    }

    fn octaves(&self) -> Octave {
        self.octaves
    }

    fn initial_octave(&self) -> Octave {
        self.initial_octave
    }

    fn select(&mut self, device: &mut AudioDevice) -> Result<Status> {
        device.open(self.settings.device)?;
        self.samples = self
            .files
            .files()
            .iter()
            .map(|path| Clip::load(path).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("{}: loaded {} samples", self.name, self.samples.len());
        Ok(Status::none())
    }

    fn deselect(&mut self, device: &mut AudioDevice) {
        device.stop_all();
        device.close();
        self.samples.clear();
    }

    fn note_on(&mut self, device: &mut AudioDevice, channel: Channel, octave: Octave) -> Result<Status> {
        let slot = Self::slot(channel, octave);
        let Some(sample) = self.samples.get(slot) else {
            return Ok(Status::empty());
        };
        device.play(sample, Playback::with_loops(self.settings.loops));
        Ok(Status::message(
            self.files.get(slot).map(file_name).unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::fs;

    fn write_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..441 {
            writer.write_sample(((i % 50) * 300) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn folder_with(count: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for i in 1..=count {
            write_wav(&dir.path().join(format!("s{i}.wav")));
        }
        dir
    }

    #[test]
    fn layout_follows_file_count() {
        let dir = folder_with(3);
        let player = SamplePlayerInstrument::new_with(dir.path(), SamplerSettings::default());
        assert_eq!(player.octaves(), 0);
        assert_eq!(player.initial_octave(), 0);
        assert!(player.name().starts_with("WavPlayer:"));
        assert_eq!(player.name(), format!("WavPlayer:{}", file_name(dir.path())));

        let dir = folder_with(25);
        let player = SamplePlayerInstrument::new_with(dir.path(), SamplerSettings::default());
        assert_eq!(player.octaves(), 2);
        assert_eq!(player.initial_octave(), 1);
        assert_eq!(file_name(player.files().get(9).unwrap()), "s10.wav");
    }

    #[test]
    fn every_slot_either_plays_or_is_empty() {
        let dir = folder_with(14);
        let mut device = AudioDevice::new_null();
        let mut player = SamplePlayerInstrument::new_with(dir.path(), SamplerSettings::default());
        player.select(&mut device).unwrap();
        let config = device.config().unwrap();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.buffer_size, 512);
        assert_eq!(config.max_voices, 32);

        for octave in 0..=player.octaves() {
            for channel in 0..12 {
                let slot = SamplePlayerInstrument::slot(channel, octave);
                let on = player.note_on(&mut device, channel, octave).unwrap();
                if slot < 14 {
                    assert_eq!(on.text(), Some(format!("s{}.wav", slot + 1).as_str()));
                } else {
                    assert!(on.is_empty(), "slot {slot} should be out of range");
                }
                assert_eq!(player.note_off(&mut device, channel, octave).unwrap(), Status::none());
            }
        }
        device.stop_all();
        player.deselect(&mut device);
        assert!(!device.is_open());
        assert!(player.note_on(&mut device, 0, 0).unwrap().is_empty());
    }

    #[test]
    fn undecodable_file_fails_select() {
        let dir = folder_with(1);
        fs::write(dir.path().join("s2.wav"), b"not audio").unwrap();
        let mut device = AudioDevice::new_null();
        let mut player = SamplePlayerInstrument::new_with(dir.path(), SamplerSettings::default());
        assert!(matches!(
            player.select(&mut device),
            Err(Error::Asset { .. })
        ));
    }

    #[test]
    fn hidden_stubs_are_not_samples() {
        let dir = folder_with(2);
        fs::write(dir.path().join("._s1.wav"), b"resource fork").unwrap();
        let mut device = AudioDevice::new_null();
        let mut player = SamplePlayerInstrument::new_with(dir.path(), SamplerSettings::default());
        assert_eq!(player.files().len(), 2);
        player.select(&mut device).unwrap();
        assert_eq!(player.note_on(&mut device, 0, 0).unwrap().text(), Some("s1.wav"));
    }

    #[test]
    fn loops_come_from_settings() {
        let dir = folder_with(1);
        let mut device = AudioDevice::new_null();
        let settings = SamplerSettings {
            loops: -1,
            ..Default::default()
        };
        let mut player = SamplePlayerInstrument::new_with(dir.path(), settings);
        player.select(&mut device).unwrap();
        player.note_on(&mut device, 0, 0).unwrap();
        let mut out = vec![0.0; 44100];
        device.render(&mut out);
        assert_eq!(device.voice_count(), 1, "a forever loop outlives its clip");
    }
}

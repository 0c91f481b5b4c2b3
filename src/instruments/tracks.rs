// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{Instrument, SampleFiles, Status};
use crate::{
    audio::{AudioDevice, Clip, DeviceConfig, Playback},
    settings::TrackSettings,
    types::{Channel, Octave},
    util::file_name,
    Result,
};
use std::{collections::HashMap, path::Path, sync::Arc};

/// A sound board for longer tracks. Each key plays one track while held.
///
/// The octave doesn't transpose anything. It picks the rate the audio device
/// runs at, and tracks play their raw frames at that rate, so higher octaves
/// play faster and higher. Changing octave means tearing the device down and
/// reopening it, which silences whatever was playing.
#[derive(Debug)]
pub struct LoopingTrackInstrument {
    name: String,
    settings: TrackSettings,
    files: SampleFiles,
    last_octave: Octave,

    /// Decoded lazily, kept until deselect.
    tracks: HashMap<usize, Arc<Clip>>,
}
impl LoopingTrackInstrument {
    /// Scans `folder` for tracks. Nothing is decoded until a key is pressed.
    pub fn new_with(folder: &Path, settings: TrackSettings) -> Self {
        let files = SampleFiles::scan(folder, &settings.patterns);
        Self {
            name: format!("Songs:{}", files.folder_name()),
            last_octave: settings.initial_octave,
            settings,
            files,
            tracks: Default::default(),
        }
    }

    #[allow(missing_docs)]
    pub fn files(&self) -> &SampleFiles {
        &self.files
    }

    fn device_config(&self, base: &DeviceConfig, octave: Octave) -> DeviceConfig {
        DeviceConfig {
            sample_rate: self.settings.rate_for(octave),
            ..*base
        }
    }

    fn track(&mut self, slot: usize) -> Result<Option<Arc<Clip>>> {
        if let Some(track) = self.tracks.get(&slot) {
            return Ok(Some(Arc::clone(track)));
        }
        let Some(path) = self.files.get(slot) else {
            return Ok(None);
        };
        let track = Arc::new(Clip::load(path)?);
        self.tracks.insert(slot, Arc::clone(&track));
        Ok(Some(track))
    }
}
impl Instrument for LoopingTrackInstrument {
    fn name(&self) -> &str {
        &self.name
    }

    fn octaves(&self) -> Octave {
        self.settings.octaves
    }

    fn initial_octave(&self) -> Octave {
        self.settings.initial_octave
    }

    fn select(&mut self, device: &mut AudioDevice) -> Result<Status> {
        let octave = self.settings.initial_octave;
        device.open(self.device_config(&self.settings.select_device, octave))?;
        self.last_octave = octave;
        Ok(Status::none())
    }

    fn deselect(&mut self, device: &mut AudioDevice) {
        device.stop_all();
        device.close();
        self.tracks.clear();
    }

    fn note_on(&mut self, device: &mut AudioDevice, channel: Channel, octave: Octave) -> Result<Status> {
        let slot = channel as usize;
        if slot >= self.files.len() {
            return Ok(Status::empty());
        }
        if octave != self.last_octave {
            let config = self.device_config(&self.settings.reinit_device, octave);
            log::debug!("{}: octave {octave}, device to {} Hz", self.name, config.sample_rate);
            device.reinitialize(config)?;
            self.last_octave = octave;
        }
        let Some(track) = self.track(slot)? else {
            return Ok(Status::empty());
        };
        // One track at a time; a new one replaces whatever was playing.
        device.stop_all();
        device.play(
            &track,
            Playback::with_loops(self.settings.loops).at_device_rate(),
        );
        Ok(Status::message(
            self.files.get(slot).map(file_name).unwrap_or_default(),
        ))
    }

    fn note_off(&mut self, device: &mut AudioDevice, _: Channel, _: Octave) -> Result<Status> {
        device.stop_all();
        Ok(Status::none())
    }
}

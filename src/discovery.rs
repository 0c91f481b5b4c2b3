// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Finds sample and track instruments on disk.

use crate::{
    instruments::{Instrument, LoopingTrackInstrument, SamplePlayerInstrument},
    settings::Settings,
    util::subdirectories,
};
use std::path::Path;

/// Each subdirectory of `sounds` can become up to two instruments: a sample
/// player if it has samples, and a track player if it has tracks. Folders
/// with neither are skipped. Nothing is decoded yet.
pub fn discover_instruments(sounds: &Path, settings: &Settings) -> Vec<Box<dyn Instrument>> {
    let folders = subdirectories(sounds);
    if folders.is_empty() {
        log::warn!("no instrument folders in {sounds:?}");
    }
    let mut instruments: Vec<Box<dyn Instrument>> = Vec::default();
    for folder in folders {
        let player = SamplePlayerInstrument::new_with(&folder, settings.sampler.clone());
        if !player.files().is_empty() {
            log::debug!("{folder:?}: {} samples", player.files().len());
            instruments.push(Box::new(player));
        }
        let tracks = LoopingTrackInstrument::new_with(&folder, settings.tracks.clone());
        if !tracks.files().is_empty() {
            log::debug!("{folder:?}: {} tracks", tracks.files().len());
            instruments.push(Box::new(tracks));
        }
    }
    instruments
}

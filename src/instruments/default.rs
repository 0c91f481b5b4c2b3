// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{Instrument, Status};
use crate::{
    audio::AudioDevice,
    types::{key_name, Channel, Octave},
    Result,
};

/// Makes no sound. It just reports which key was pressed, which makes it a
/// good way to check that a controller is wired up.
#[derive(Debug)]
pub struct DefaultInstrument {
    name: String,
    octaves: Octave,
    initial_octave: Octave,
}
impl Default for DefaultInstrument {
    fn default() -> Self {
        Self::new_with("", 10, 5)
    }
}
impl DefaultInstrument {
    #[allow(missing_docs)]
    pub fn new_with(name: &str, octaves: Octave, initial_octave: Octave) -> Self {
        Self {
            name: name.to_string(),
            octaves,
            initial_octave,
        }
    }
}
impl Instrument for DefaultInstrument {
    fn name(&self) -> &str {
        &self.name
    }

    fn octaves(&self) -> Octave {
        self.octaves
    }

    fn initial_octave(&self) -> Octave {
        self.initial_octave
    }

    fn note_on(&mut self, _: &mut AudioDevice, channel: Channel, octave: Octave) -> Result<Status> {
        Ok(match key_name(channel) {
            Some(key) => Status::message(format!("Note: {key} Octave: {octave}")),
            None => Status::empty(),
        })
    }
}

// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! The ordered set of instruments the player cycles through.

use crate::{
    audio::AudioDevice,
    display::DisplaySink,
    instruments::{Instrument, Status},
    types::OctaveRange,
    Result,
};

/// Says which instrument [InstrumentRegistry::remove()] should remove.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoveTarget {
    /// The first instrument with this name.
    Name(String),
    #[allow(missing_docs)]
    Index(usize),
}
impl From<&str> for RemoveTarget {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}
impl From<usize> for RemoveTarget {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// The selected instrument together with what it's allowed to touch.
#[derive(Debug)]
pub struct ActiveInstrument<'a> {
    #[allow(missing_docs)]
    pub instrument: &'a mut Box<dyn Instrument>,
    #[allow(missing_docs)]
    pub device: &'a mut AudioDevice,
    #[allow(missing_docs)]
    pub octave: &'a mut OctaveRange,
}

/// Owns the instruments and the one [AudioDevice], and makes sure that at most
/// one instrument is selected at a time.
#[derive(Debug)]
pub struct InstrumentRegistry {
    instruments: Vec<Box<dyn Instrument>>,
    active: Option<usize>,
    octave: OctaveRange,
    device: AudioDevice,
}
impl InstrumentRegistry {
    #[allow(missing_docs)]
    pub fn new_with(device: AudioDevice) -> Self {
        Self {
            instruments: Default::default(),
            active: None,
            octave: Default::default(),
            device,
        }
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.instruments
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    #[allow(missing_docs)]
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    #[allow(missing_docs)]
    pub fn active(&self) -> Option<&dyn Instrument> {
        self.active
            .and_then(|i| self.instruments.get(i))
            .map(|i| i.as_ref())
    }

    /// The active instrument's name, or an empty string if nothing is
    /// selected.
    pub fn active_name(&self) -> &str {
        self.active().map(|i| i.name()).unwrap_or_default()
    }

    /// Lends out the active instrument along with the device and octave.
    pub fn active_mut(&mut self) -> Option<ActiveInstrument<'_>> {
        let index = self.active?;
        let instrument = self.instruments.get_mut(index)?;
        Some(ActiveInstrument {
            instrument,
            device: &mut self.device,
            octave: &mut self.octave,
        })
    }

    /// The current octave and its allowed range.
    pub fn octave(&self) -> OctaveRange {
        self.octave
    }

    #[allow(missing_docs)]
    pub fn device(&self) -> &AudioDevice {
        &self.device
    }

    /// Appends an instrument without selecting it. Returns the new count.
    pub fn add(&mut self, instrument: Box<dyn Instrument>, display: &mut dyn DisplaySink) -> usize {
        let message = format!("Added instrument: {}", instrument.name());
        log::info!("{message}");
        self.instruments.push(instrument);
        display.show_status(self.active_name(), &message);
        self.instruments.len()
    }

    /// Makes the instrument at `index` the active one. The previous one is
    /// deselected first. Indexes past the end are ignored.
    ///
    /// The octave always restarts at the new instrument's initial octave,
    /// even if it was selected before.
    pub fn select(&mut self, index: usize, display: &mut dyn DisplaySink) -> Result<()> {
        if index >= self.instruments.len() {
            return Ok(());
        }
        self.deselect();

        let instrument = &mut self.instruments[index];
        self.octave = OctaveRange::new_with(instrument.initial_octave(), instrument.octaves());
        let status = match instrument.select(&mut self.device) {
            Ok(status) => status,
            Err(e) => {
                instrument.deselect(&mut self.device);
                return Err(e);
            }
        };
        self.active = Some(index);
        log::debug!("selected {index}: {}", instrument.name());

        report(display, instrument.name(), status.text().unwrap_or_default(), &status);
        display.render_octave_bar(self.octave.current, self.octave.max);
        Ok(())
    }

    /// Deselects the active instrument, leaving nothing selected.
    pub fn deselect(&mut self) {
        if let Some(index) = self.active.take() {
            if let Some(instrument) = self.instruments.get_mut(index) {
                instrument.deselect(&mut self.device);
            }
        }
    }

    /// Selects the next instrument, wrapping around.
    pub fn cycle(&mut self, display: &mut dyn DisplaySink) -> Result<()> {
        if self.instruments.is_empty() {
            return Ok(());
        }
        let next = self
            .active
            .map_or(0, |i| (i + 1) % self.instruments.len());
        self.select(next, display)
    }

    /// Removes the active instrument if `target` names it, then selects the
    /// first one. Nothing happens if `target` names an inactive instrument, or
    /// if removing would leave the registry empty.
    pub fn remove(
        &mut self,
        target: RemoveTarget,
        display: &mut dyn DisplaySink,
    ) -> Result<Option<Box<dyn Instrument>>> {
        if self.instruments.len() <= 1 {
            return Ok(None);
        }
        let index = match target {
            RemoveTarget::Name(name) => self.instruments.iter().position(|i| i.name() == name),
            RemoveTarget::Index(index) => Some(index),
        };
        let Some(index) = index.filter(|i| Some(*i) == self.active) else {
            return Ok(None);
        };

        let mut removed = self.instruments.remove(index);
        removed.deselect(&mut self.device);
        self.active = None;
        self.select(0, display)?;
        Ok(Some(removed))
    }
}

/// Shows a status line and any toggle change that came with it.
pub(crate) fn report(display: &mut dyn DisplaySink, name: &str, message: &str, status: &Status) {
    display.show_status(name, message);
    if let Some(toggle) = status.toggle.as_ref() {
        display.render_toggle(toggle);
    }
}

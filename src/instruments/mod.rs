// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! The things a player can select and play.
//!
//! Every instrument follows the same lifecycle. Construction is cheap and
//! touches no hardware. [Instrument::select()] acquires whatever the
//! instrument needs (opening the audio device, decoding files, connecting to a
//! MIDI client), and [Instrument::deselect()] gives it all back. The registry
//! guarantees that at most one instrument is selected at a time, and lends
//! the selected one the [AudioDevice] for each call.

use crate::{
    audio::{AudioDevice, Waveform},
    types::{Channel, Octave},
    Result,
};
use std::fmt::Debug;

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        DefaultInstrument, Instrument, LoopingTrackInstrument, RecordingRelayClient, RelayClient,
        RelayInstrument, SamplePlayerInstrument, Status, SynthInstrument, ToggleChange,
    };
}

pub use default::DefaultInstrument;
pub use relay::{RecordingRelayClient, RelayClient, RelayInstrument};
pub use sampler::{SampleFiles, SamplePlayerInstrument};
pub use synth::SynthInstrument;
pub use tracks::LoopingTrackInstrument;

mod default;
mod relay;
mod sampler;
mod synth;
mod tracks;

/// A synth waveform was switched on or off. Instruments report this instead
/// of drawing anything themselves; the display decides how to show it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToggleChange {
    /// The waveform that changed.
    pub kind: Waveform,
    /// The controller key associated with the toggle, for indicators.
    pub key: Channel,
    /// The new state.
    pub enabled: bool,
}

/// What an instrument has to say after handling an event.
///
/// `message` is None when the instrument has nothing to say, which is
/// different from an empty message: an empty message still replaces whatever
/// the display was showing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    /// Text for the status line.
    pub message: Option<String>,
    /// A structured toggle change, if the event flipped one.
    pub toggle: Option<ToggleChange>,
}
impl Status {
    /// Nothing to report.
    pub fn none() -> Self {
        Self::default()
    }

    /// An empty message. This is how out-of-range events are answered.
    pub fn empty() -> Self {
        Self::message("")
    }

    #[allow(missing_docs)]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            toggle: None,
        }
    }

    /// Attaches a toggle change.
    pub fn with_toggle(mut self, toggle: ToggleChange) -> Self {
        self.toggle = Some(toggle);
        self
    }

    /// The message text, if there is one.
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// True if this is an empty message with no toggle.
    pub fn is_empty(&self) -> bool {
        self.text() == Some("") && self.toggle.is_none()
    }
}

/// Something that turns key events into sound, or into messages for something
/// else that makes sound.
pub trait Instrument: Debug {
    /// Shown in front of every status message.
    fn name(&self) -> &str;

    /// The highest octave the dispatcher should allow. The range is
    /// `0..=octaves`.
    fn octaves(&self) -> Octave;

    /// The octave the dispatcher starts at whenever this instrument is
    /// selected.
    fn initial_octave(&self) -> Octave;

    /// Acquires resources. Errors here are fatal.
    fn select(&mut self, device: &mut AudioDevice) -> Result<Status> {
        let _ = device;
        Ok(Status::none())
    }

    /// Releases everything [Instrument::select()] acquired. Calling this on an
    /// instrument that isn't selected must be harmless.
    fn deselect(&mut self, device: &mut AudioDevice) {
        let _ = device;
    }

    /// A key was pressed.
    fn note_on(&mut self, device: &mut AudioDevice, channel: Channel, octave: Octave)
        -> Result<Status>;

    /// A key was released.
    fn note_off(
        &mut self,
        device: &mut AudioDevice,
        channel: Channel,
        octave: Octave,
    ) -> Result<Status> {
        let _ = (device, channel, octave);
        Ok(Status::none())
    }

    /// The octave went up; `octave` is the new, already clamped value.
    fn octave_up(&mut self, device: &mut AudioDevice, octave: Octave) -> Result<Status> {
        let _ = (device, octave);
        Ok(Status::none())
    }

    /// The octave went down; `octave` is the new, already clamped value.
    fn octave_down(&mut self, device: &mut AudioDevice, octave: Octave) -> Result<Status> {
        let _ = (device, octave);
        Ok(Status::none())
    }
}

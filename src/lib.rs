// Copyright (c) 2023 Mike Tsao. All rights reserved.

#![warn(missing_docs)]

//! The `pipiano` crate turns a thirteen-key controller into a set of
//! switchable instruments.
//!
//! A controller source (the terminal keyboard or a MIDI controller) sends
//! [ControllerEvent](controller::ControllerEvent)s to a
//! [RuntimeDispatcher](runtime::RuntimeDispatcher), which hands each one to
//! whichever [Instrument](instruments::Instrument) is active. Instruments
//! either make sound through the shared [AudioDevice](audio::AudioDevice)
//! or relay the event to an external MIDI synthesizer, and answer with a
//! [Status](instruments::Status) that the
//! [DisplaySink](display::DisplaySink) shows to the player.

pub mod audio;
pub mod controller;
pub mod discovery;
pub mod display;
pub mod instruments;
pub mod midi;
pub mod registry;
pub mod runtime;
pub mod settings;
pub mod types;
pub mod util;

pub use error::{Error, Result};

mod error;

/// A collection of imports that are useful to users of this crate. `use
/// pipiano::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        audio::prelude::*,
        controller::{ControllerEvent, HeldKeys, InputEvent, KeyMap, TerminalKeyboard},
        discovery::discover_instruments,
        display::{ConsoleDisplay, DisplaySink, RecordingDisplay},
        instruments::prelude::*,
        midi::prelude::*,
        registry::{InstrumentRegistry, RemoveTarget},
        runtime::{run, RuntimeDispatcher},
        settings::Settings,
        types::{Channel, Octave, OctaveRange},
        util::prelude::*,
        Error, Result,
    };
}

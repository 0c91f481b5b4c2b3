// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! The error taxonomy of the runtime.
//!
//! Only failures that should stop the run are errors. Out-of-range channels,
//! octaves, slots and patches are not errors at all; instruments answer them
//! with [Status::empty()](crate::instruments::Status::empty).

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong inside the runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// An audio file couldn't be opened or decoded. Fatal at `select()` time.
    #[error("couldn't load audio file {path:?}: {reason}")]
    Asset {
        /// The file that failed.
        path: PathBuf,
        /// What the decoder said.
        reason: String,
    },

    /// The audio device couldn't be opened or reopened. No fallback
    /// configuration is attempted.
    #[error("audio device error: {0}")]
    Device(String),

    /// The external MIDI client refused a session or a message.
    #[error("MIDI relay error: {0}")]
    Relay(String),

    /// The MIDI subsystem or a controller port isn't available. Callers treat
    /// this as a warning and carry on without MIDI.
    #[error("MIDI unavailable: {0}")]
    Midi(String),

    /// A settings file existed but couldn't be parsed.
    #[error("couldn't parse settings file {path:?}: {source}")]
    Settings {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        source: serde_json::Error,
    },

    #[allow(missing_docs)]
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Everything that talks to the system's MIDI subsystem through [midir].

/// Recommended imports for easy onboarding.
pub mod prelude {
    pub use super::{
        list_ports, relay_candidates, relay_instruments, MidiController, MidiControllerMap,
        MidirRelayClient, PortListing, RelayCandidate,
    };
}

pub use controller::{MidiController, MidiControllerMap};
pub use ports::{
    client_name, list_output_clients, list_ports, relay_candidates, relay_instruments,
    PortListing, RelayCandidate,
};
pub use relay_client::MidirRelayClient;

mod controller;
mod ports;
mod relay_client;

/// The name this program uses when it registers with the MIDI subsystem.
pub const CLIENT_NAME: &str = "pipiano";

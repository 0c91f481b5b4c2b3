// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{MidirRelayClient, CLIENT_NAME};
use crate::{
    display::DisplaySink,
    instruments::{Instrument, RelayInstrument},
    settings::RelaySettings,
    Error, Result,
};
use midir::{MidiInput, MidiOutput};

/// The client part of a port name. ALSA names ports `client:port N:M`;
/// other backends have no client part, so the whole name is used.
pub fn client_name(port_name: &str) -> &str {
    port_name
        .split_once(':')
        .map_or(port_name, |(client, _)| client)
        .trim()
}

/// Names of every client that has at least one MIDI output port, in the
/// order the system reports them, without duplicates.
pub fn list_output_clients() -> Result<Vec<String>> {
    let output = MidiOutput::new(CLIENT_NAME).map_err(|e| Error::Midi(e.to_string()))?;
    let mut clients: Vec<String> = Vec::default();
    for port in output.ports() {
        match output.port_name(&port) {
            Ok(name) => {
                let client = client_name(&name);
                if !clients.iter().any(|c| c == client) {
                    clients.push(client.to_string());
                }
            }
            Err(e) => log::warn!("skipping unnamed MIDI port: {e}"),
        }
    }
    Ok(clients)
}

/// Every MIDI port on the system, as reported by `--list-ports`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortListing {
    /// Ports that could act as a hardware controller.
    pub inputs: Vec<String>,
    /// Ports that relays could send to.
    pub outputs: Vec<String>,
}

/// Lists input and output port names.
pub fn list_ports() -> Result<PortListing> {
    let input = MidiInput::new(CLIENT_NAME).map_err(|e| Error::Midi(e.to_string()))?;
    let output = MidiOutput::new(CLIENT_NAME).map_err(|e| Error::Midi(e.to_string()))?;
    Ok(PortListing {
        inputs: input
            .ports()
            .iter()
            .filter_map(|p| input.port_name(p).ok())
            .collect(),
        outputs: output
            .ports()
            .iter()
            .filter_map(|p| output.port_name(p).ok())
            .collect(),
    })
}

/// A client that may become a relay instrument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayCandidate {
    #[allow(missing_docs)]
    pub name: String,
    /// True if the client isn't on the allow list.
    pub is_unknown: bool,
}

/// Filters client names through the ignore and allow lists. Ignored clients
/// are dropped. Unknown clients are kept only if `load_unknown` is set.
pub fn relay_candidates(clients: &[String], settings: &RelaySettings) -> Vec<RelayCandidate> {
    clients
        .iter()
        .filter(|name| !settings.ignore.contains(*name))
        .map(|name| RelayCandidate {
            name: name.clone(),
            is_unknown: !settings.allow.contains(name),
        })
        .filter(|c| settings.load_unknown || !c.is_unknown)
        .collect()
}

/// Builds a relay instrument for each usable MIDI output client. If the MIDI
/// subsystem isn't there, says so and returns nothing.
pub fn relay_instruments(
    settings: &RelaySettings,
    display: &mut dyn DisplaySink,
) -> Vec<Box<dyn Instrument>> {
    let clients = match list_output_clients() {
        Ok(clients) => clients,
        Err(e) => {
            log::warn!("{e}");
            display.show_status("", &format!("No MIDI relays: {e}"));
            return Vec::default();
        }
    };
    relay_candidates(&clients, settings)
        .into_iter()
        .map(|candidate| {
            if candidate.is_unknown {
                let message = format!("Loading unknown MIDI Hardware: {}", candidate.name);
                log::warn!("{message}");
                display.show_status("", &message);
            }
            Box::new(RelayInstrument::new_with(
                &candidate.name,
                Box::new(MidirRelayClient::new_with(&candidate.name)),
                settings.clone(),
            )) as Box<dyn Instrument>
        })
        .collect()
}

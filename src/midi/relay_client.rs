// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{client_name, CLIENT_NAME};
use crate::{instruments::RelayClient, Error, Result};
use derivative::Derivative;
use midir::{MidiOutput, MidiOutputConnection};
use midly::live::LiveEvent;

/// Sends relay events to a MIDI output port. The session is the midir
/// connection, so connecting opens the port and disconnecting closes it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct MidirRelayClient {
    client: String,
    #[derivative(Debug = "ignore")]
    connection: Option<MidiOutputConnection>,
    buffer: Vec<u8>,
}
impl MidirRelayClient {
    /// `client` is the MIDI client name, such as `yoshimi`. The first output
    /// port belonging to that client is used.
    pub fn new_with(client: &str) -> Self {
        Self {
            client: client.to_string(),
            connection: None,
            buffer: Vec::with_capacity(3),
        }
    }
}
impl RelayClient for MidirRelayClient {
    fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        let output = MidiOutput::new(CLIENT_NAME).map_err(|e| Error::Relay(e.to_string()))?;
        let port = output
            .ports()
            .into_iter()
            .find(|port| {
                output
                    .port_name(port)
                    .is_ok_and(|name| client_name(&name) == self.client)
            })
            .ok_or_else(|| Error::Relay(format!("{} has no output port", self.client)))?;
        let connection = output
            .connect(&port, &format!("{CLIENT_NAME}-relay"))
            .map_err(|e| Error::Relay(e.to_string()))?;
        log::info!("connected to MIDI client {}", self.client);
        self.connection = Some(connection);
        Ok(())
    }

    fn send(&mut self, event: LiveEvent<'static>) -> Result<()> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(Error::Relay(format!("not connected to {}", self.client)));
        };
        self.buffer.clear();
        event.write_std(&mut self.buffer)?;
        connection
            .send(&self.buffer)
            .map_err(|e| Error::Relay(e.to_string()))
    }

    fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            log::info!("disconnected from MIDI client {}", self.client);
        }
    }
}
impl Drop for MidirRelayClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

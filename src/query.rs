//! The two query modes. One engine instance owns one transport for the
//! whole run and walks the address range strictly sequentially; the
//! gateway's embedded server tolerates only a handful of sessions, so
//! nothing here is, or should become, concurrent.

use crate::piko::decode;
use crate::piko::frame::{self, Command};
use crate::piko::model::{InverterIdentity, TelemetryReading};
use crate::prelude::*;
use crate::transport::Transport;

/// Attempts per address in runtime mode. Discovery has no retries; none
/// exist in the protocol's observed behavior.
pub const MAX_ATTEMPTS: u32 = 2;

/// Discovery always walks the full bus.
pub const DISCOVERY_RANGE: (u8, u8) = (1, 254);

/// Where successful readings go. The CSV writer implements this; tests
/// substitute a collector.
pub trait ReadingSink {
    fn write_reading(&mut self, address: u8, reading: &TelemetryReading) -> anyhow::Result<()>;
}

/// Terminal state of one address in runtime mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressOutcome {
    /// A reading was emitted to the sink; no further attempts were made.
    Succeeded,
    /// Every attempt failed; the address was skipped with nothing emitted.
    Exhausted,
}

pub struct QueryEngine<T> {
    transport: T,
}

impl<T: Transport> QueryEngine<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Hands the transport back for explicit teardown.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// One request/response exchange, gated on checksum and the command's
    /// minimum length. Everything downstream may assume a validated frame.
    async fn fetch(&mut self, command: Command, address: u8) -> Result<Vec<u8>> {
        let request = frame::build_request(command, address);
        let response = self.transport.exchange(&request).await?;
        if !frame::verify_checksum(&response) || response.len() < command.min_response_len() {
            return Err(Error::BadFrame {
                len: response.len(),
            });
        }
        Ok(response)
    }

    /// Like `fetch`, but a corrupt frame degrades to `None` instead of
    /// failing the whole probe. Transport errors still propagate: once an
    /// exchange times out there is no point issuing the remaining
    /// sub-probes against the same dead address.
    async fn fetch_lenient(&mut self, command: Command, address: u8) -> Result<Option<Vec<u8>>> {
        match self.fetch(command, address).await {
            Ok(response) => Ok(Some(response)),
            Err(e @ Error::BadFrame { .. }) => {
                debug!("address {address}: {command:?} probe failed: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Issues the four metadata sub-probes for one address. Each one
    /// validates independently; missing or garbled answers leave their
    /// fields empty and clear the identity's `complete` flag.
    pub async fn probe_identity(&mut self, address: u8) -> Result<InverterIdentity> {
        let device_info = self.fetch_lenient(Command::DeviceInfo, address).await?;
        let name = self.fetch_lenient(Command::Name, address).await?;
        let serial = self.fetch_lenient(Command::SerialNumber, address).await?;
        let version = self.fetch_lenient(Command::Version, address).await?;

        let identity = decode::assemble_identity(
            device_info.as_deref(),
            name.as_deref(),
            serial.as_deref(),
            version.as_deref(),
        );
        debug!("address {address}: metadata {identity:?}");
        Ok(identity)
    }

    /// Probes the full bus for inverter identities. A failure at one
    /// address, network or otherwise, never stops the scan of the rest.
    pub async fn discover(&mut self) -> Vec<(u8, InverterIdentity)> {
        let (start, end) = DISCOVERY_RANGE;
        self.discover_range(start, end).await
    }

    pub async fn discover_range(&mut self, start: u8, end: u8) -> Vec<(u8, InverterIdentity)> {
        let mut found = Vec::new();
        for address in start..=end {
            match self.probe_identity(address).await {
                Ok(identity) if identity.complete => {
                    info!("address {address}: {identity}");
                    found.push((address, identity));
                }
                Ok(_) => {}
                Err(e) => debug!("address {address}: probe aborted: {e}"),
            }
        }
        found
    }

    /// One runtime attempt: five commands, five validated responses, one
    /// immutable reading. The first failing sub-response fails the whole
    /// attempt; partial data is never observable.
    pub async fn read_telemetry(&mut self, address: u8) -> Result<TelemetryReading> {
        let status = self.fetch(Command::Status, address).await?;
        let bulk = self.fetch(Command::Telemetry, address).await?;
        let total_energy = self.fetch(Command::TotalEnergy, address).await?;
        let daily_energy = self.fetch(Command::DailyEnergy, address).await?;
        let total_hours = self.fetch(Command::TotalHours, address).await?;
        decode::decode_telemetry(&status, &bulk, &total_energy, &daily_energy, &total_hours)
    }

    /// Runtime mode over `[start, end]` inclusive. Every address reaches
    /// one of the two terminal states; exhaustion skips the address and
    /// the loop moves on.
    pub async fn poll_runtime(
        &mut self,
        start: u8,
        end: u8,
        sink: &mut dyn ReadingSink,
    ) -> Result<Vec<(u8, AddressOutcome)>> {
        if start == 0 || start > end {
            return Err(Error::AddressRange { start, end });
        }

        let mut outcomes = Vec::with_capacity(usize::from(end - start) + 1);
        for address in start..=end {
            let outcome = self.poll_address(address, sink).await;
            if outcome == AddressOutcome::Exhausted {
                info!("address {address}: no valid reading after {MAX_ATTEMPTS} attempts, skipping");
            }
            outcomes.push((address, outcome));
        }
        Ok(outcomes)
    }

    async fn poll_address(&mut self, address: u8, sink: &mut dyn ReadingSink) -> AddressOutcome {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.read_telemetry(address).await {
                Ok(reading) => match sink.write_reading(address, &reading) {
                    Ok(()) => {
                        debug!("address {address}: reading logged on attempt {attempt}");
                        return AddressOutcome::Succeeded;
                    }
                    // A write failure spends an attempt too; the line is
                    // lost either way and the data may be stale by the
                    // time a later retry would land.
                    Err(e) => warn!("address {address}: log write failed: {e:#}"),
                },
                Err(e) => debug!("address {address}: attempt {attempt} failed: {e}"),
            }
        }
        AddressOutcome::Exhausted
    }
}

use parking_lot::Mutex;
use std::{
    io::{ErrorKind, Read},
    sync::Arc,
    time::Duration,
};

use super::{
    DeviceAddress, PortRegistry, Result, Rs485Config, SharedConnection, TransportError,
    DEFAULT_RESPONSE_TIMEOUT,
};

/// Per-client view of a serial line.
///
/// Every public method holds the handle's own lock for its whole duration,
/// so operations on one handle never overlap. The physical port is obtained
/// from (and returned to) the [`PortRegistry`] the handle was built with.
pub struct LineHandle {
    address: DeviceAddress,
    rs485: Rs485Config,
    timeout: Duration,
    registry: Arc<PortRegistry>,
    connection: Mutex<Option<SharedConnection>>,
}

impl LineHandle {
    pub fn new(address: DeviceAddress, registry: Arc<PortRegistry>) -> Self {
        Self {
            address,
            rs485: Rs485Config::disabled(),
            timeout: DEFAULT_RESPONSE_TIMEOUT,
            registry,
            connection: Mutex::new(None),
        }
    }

    pub fn with_rs485(mut self, rs485: Rs485Config) -> Self {
        self.rs485 = rs485;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    pub fn rs485(&self) -> &Rs485Config {
        &self.rs485
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// The shared connection currently held, if any.
    pub fn connection(&self) -> Option<SharedConnection> {
        self.connection.lock().clone()
    }

    /// Acquire the line from the registry. No-op when already connected.
    ///
    /// Framing the driver cannot express (data bits outside 5..=8, stop bits
    /// other than 1 or 2) fails with [`TransportError::Config`] before the
    /// device is touched; failures of the open call itself are
    /// [`TransportError::Open`].
    pub fn connect(&self) -> Result<()> {
        let mut slot = self.connection.lock();
        if slot.is_some() {
            return Ok(());
        }
        log::debug!("Connecting to {}", self.address);
        *slot = Some(self.registry.acquire(&self.address)?);
        Ok(())
    }

    /// Give the line back. The device is closed once no other handle holds it.
    pub fn close(&self) -> Result<()> {
        let mut slot = self.connection.lock();
        if let Some(connection) = slot.take() {
            self.registry.release(&self.address, &connection);
        }
        Ok(())
    }

    /// Send `bytes`, applying RS-485 direction control when configured.
    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        let slot = self.connection.lock();
        let connection = slot.as_ref().ok_or(TransportError::NotConnected)?;
        connection.with_line(|line| self.rs485.transmit(line, bytes))
    }

    /// Read whatever is available, waiting at most the response timeout.
    pub fn read(&self, buffer: &mut [u8]) -> Result<usize> {
        let slot = self.connection.lock();
        let connection = slot.as_ref().ok_or(TransportError::NotConnected)?;
        if buffer.is_empty() {
            return Ok(0);
        }
        connection.with_line(|line| {
            line.set_timeout(self.timeout)?;
            match line.read(buffer) {
                Ok(0) => Err(TransportError::Timeout(self.timeout)),
                Ok(n) => Ok(n),
                Err(err) if err.kind() == ErrorKind::TimedOut => {
                    Err(TransportError::Timeout(self.timeout))
                }
                Err(err) => Err(err.into()),
            }
        })
    }
}

impl Drop for LineHandle {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            self.registry.release(&self.address, &connection);
        }
    }
}

impl std::fmt::Debug for LineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineHandle")
            .field("address", &self.address)
            .field("rs485", &self.rs485)
            .field("timeout", &self.timeout)
            .field("connected", &self.is_connected())
            .finish()
    }
}

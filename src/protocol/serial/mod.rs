//! Shared serial transport for Modbus RTU.
//!
//! Logical clients hold a [`LineHandle`]; handles configured with the same
//! [`DeviceAddress`] share one physically open port through a
//! [`PortRegistry`], which counts holders and closes the device when the
//! last one lets go. Writes go through the RS-485 direction logic in
//! [`Rs485Config::transmit`].

mod address;
mod error;
mod handle;
mod line;
mod registry;
mod rs485;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

pub use address::{parse_parity, DeviceAddress};
pub use error::{Result, TransportError};
pub use handle::LineHandle;
pub use line::{Connection, PortOpener, SerialLine, SharedConnection, SystemOpener};
pub use registry::PortRegistry;
pub use rs485::Rs485Config;

/// How long a read waits for the slave before giving up.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

//! modbustool — one-shot Modbus RTU master
//!
//! The crate is built around a shared serial transport: logical clients hold
//! a [`LineHandle`], handles for the same device share one open port through
//! a [`PortRegistry`], and writes on RS-485 lines are framed by RTS
//! direction changes and blocking delays ([`Rs485Config`]). The
//! [`ModbusClient`] issues read-holding, read-input and write-single
//! requests over a connected handle. The command line front end lives in
//! the hidden `cli` module.

#[doc(hidden)]
pub mod cli;
pub mod protocol;

pub use protocol::modbus::{ClientError, ModbusClient};
pub use protocol::serial::{
    DeviceAddress, LineHandle, PortOpener, PortRegistry, Rs485Config, SerialLine,
    TransportError, DEFAULT_RESPONSE_TIMEOUT,
};

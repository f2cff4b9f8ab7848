//! Modbus RTU request/response handling on top of the serial transport.

mod client;
pub mod frame;
mod request;

use thiserror::Error;

use crate::protocol::serial::TransportError;

pub use client::ModbusClient;
pub use request::{read_holdings_request, read_inputs_request, write_holding_request};

/// RTU ADU upper bound: address + PDU (253) + CRC.
pub const MAX_RTU_FRAME_LEN: usize = 256;

/// Largest register count a single read request may ask for.
pub const MAX_READ_REGISTERS: u16 = 125;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("slave answered function 0x{function:02X} with exception code 0x{code:02X}")]
    Exception { function: u8, code: u8 },

    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub(crate) fn protocol_error(err: rmodbus::ErrorKind) -> ClientError {
    ClientError::Protocol(err.to_string())
}

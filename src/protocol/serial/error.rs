use std::{io, time::Duration};

use thiserror::Error;

/// Failures reported by the serial transport.
///
/// None of these are recovered inside the transport; callers decide whether
/// to retry, re-connect or abort.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial line is not connected")]
    NotConnected,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("serial I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid line configuration: {0}")]
    Config(String),
}

pub type Result<T, E = TransportError> = std::result::Result<T, E>;

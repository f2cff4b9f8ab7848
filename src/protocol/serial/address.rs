use serialport::{DataBits, Parity, SerialPortBuilder, StopBits};
use std::fmt;

use super::{Result, TransportError};

/// Physical line configuration. Handles with equal addresses share one open port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    pub path: String,
    pub baud: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

impl DeviceAddress {
    /// 9600 baud, 8N1 on the given device node.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
        }
    }

    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    pub fn with_framing(mut self, data_bits: u8, parity: Parity, stop_bits: u8) -> Self {
        self.data_bits = data_bits;
        self.parity = parity;
        self.stop_bits = stop_bits;
        self
    }

    /// Registry key, e.g. `/dev/ttyUSB0@9600:8N1`.
    pub fn key(&self) -> String {
        format!(
            "{}@{}:{}{}{}",
            self.path,
            self.baud,
            self.data_bits,
            parity_letter(self.parity),
            self.stop_bits
        )
    }

    /// Reject framing values the serial driver cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(TransportError::Config("device path is empty".into()));
        }
        if self.baud == 0 {
            return Err(TransportError::Config("baud rate must be positive".into()));
        }
        self.serial_data_bits()?;
        self.serial_stop_bits()?;
        Ok(())
    }

    pub(crate) fn apply_builder(&self, builder: SerialPortBuilder) -> Result<SerialPortBuilder> {
        Ok(builder
            .data_bits(self.serial_data_bits()?)
            .stop_bits(self.serial_stop_bits()?)
            .parity(self.parity))
    }

    fn serial_data_bits(&self) -> Result<DataBits> {
        match self.data_bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(TransportError::Config(format!(
                "unsupported data bits: {other}"
            ))),
        }
    }

    fn serial_stop_bits(&self) -> Result<StopBits> {
        match self.stop_bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(TransportError::Config(format!(
                "unsupported stop bits: {other}"
            ))),
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Parse `N`/`E`/`O` (or `none`/`even`/`odd`), case-insensitive.
pub fn parse_parity(value: &str) -> Result<Parity> {
    match value.trim().to_lowercase().as_str() {
        "n" | "none" => Ok(Parity::None),
        "e" | "even" => Ok(Parity::Even),
        "o" | "odd" => Ok(Parity::Odd),
        _ => Err(TransportError::Config(format!("invalid parity: {value}"))),
    }
}

fn parity_letter(parity: Parity) -> char {
    match parity {
        Parity::None => 'N',
        Parity::Even => 'E',
        Parity::Odd => 'O',
    }
}

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

use super::actions::ModbusFunction;
use crate::protocol::serial::{parse_parity, DeviceAddress, Rs485Config};

/// Settings file layout. Every field is optional; missing ones take the
/// same defaults as the command line.
///
/// ```toml
/// [line]
/// device = "/dev/ttyUSB0"
/// baud = 19200
/// parity = "E"
///
/// [rs485]
/// enabled = true
/// rts_high_during_send = true
/// delay_before_send_ms = 2
///
/// [request]
/// client_id = 4
/// function = "rh"
/// address = 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    pub line: LineSection,
    pub rs485: Rs485Section,
    pub request: RequestSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineSection {
    pub device: String,
    pub baud: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: String,
    pub timeout_ms: u64,
}

impl Default for LineSection {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: "N".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rs485Section {
    pub enabled: bool,
    pub rts_high_during_send: bool,
    pub rts_high_after_send: bool,
    pub delay_before_send_ms: i64,
    pub delay_after_send_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestSection {
    pub client_id: u8,
    pub function: String,
    pub address: u16,
    pub value: u16,
    pub count: u16,
}

impl Default for RequestSection {
    fn default() -> Self {
        Self {
            client_id: 1,
            function: "ri".to_string(),
            address: 7,
            value: 0,
            count: 1,
        }
    }
}

/// What one invocation asks the slave to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub client_id: u8,
    pub function: ModbusFunction,
    pub address: u16,
    pub value: u16,
    pub count: u16,
}

/// Validated settings ready to build a line handle from.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub address: DeviceAddress,
    pub rs485: Rs485Config,
    pub timeout: Duration,
    pub request: Request,
}

impl ToolConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Defaults, then the `--config` file if given, then explicit flags.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => Self::load(Path::new(path))?,
            None => Self::default(),
        };
        config.apply_matches(matches);
        Ok(config)
    }

    pub fn apply_matches(&mut self, matches: &ArgMatches) {
        let line = &mut self.line;
        override_with(&mut line.device, matches.get_one::<String>("device"));
        override_with(&mut line.baud, matches.get_one::<u32>("baud"));
        override_with(&mut line.data_bits, matches.get_one::<u8>("data"));
        override_with(&mut line.stop_bits, matches.get_one::<u8>("stop"));
        override_with(&mut line.parity, matches.get_one::<String>("parity"));
        override_with(&mut line.timeout_ms, matches.get_one::<u64>("timeout"));

        let rs485 = &mut self.rs485;
        rs485.enabled |= matches.get_flag("enable_rs485");
        rs485.rts_high_during_send |= matches.get_flag("rtshighduring");
        rs485.rts_high_after_send |= matches.get_flag("rtshighafter");
        override_with(
            &mut rs485.delay_before_send_ms,
            matches.get_one::<i64>("delayduringsend"),
        );
        override_with(
            &mut rs485.delay_after_send_ms,
            matches.get_one::<i64>("delayaftersend"),
        );

        let request = &mut self.request;
        override_with(&mut request.client_id, matches.get_one::<u8>("client"));
        override_with(&mut request.function, matches.get_one::<String>("function"));
        override_with(&mut request.address, matches.get_one::<u16>("address"));
        override_with(&mut request.value, matches.get_one::<u16>("value"));
        override_with(&mut request.count, matches.get_one::<u16>("count"));
    }

    pub fn resolve(&self) -> Result<Settings> {
        let line = &self.line;
        let address = DeviceAddress::new(line.device.as_str())
            .with_baud(line.baud)
            .with_framing(line.data_bits, parse_parity(&line.parity)?, line.stop_bits);
        address.validate()?;

        if line.timeout_ms == 0 {
            anyhow::bail!("response timeout must be positive");
        }

        let rs485 = Rs485Config::from_millis(
            self.rs485.enabled,
            self.rs485.rts_high_during_send,
            self.rs485.rts_high_after_send,
            self.rs485.delay_before_send_ms,
            self.rs485.delay_after_send_ms,
        )?;

        let request = Request {
            client_id: self.request.client_id,
            function: self.request.function.parse()?,
            address: self.request.address,
            value: self.request.value,
            count: self.request.count,
        };

        Ok(Settings {
            address,
            rs485,
            timeout: Duration::from_millis(line.timeout_ms),
            request,
        })
    }
}

fn override_with<T: Clone>(slot: &mut T, value: Option<&T>) {
    if let Some(value) = value {
        *slot = value.clone();
    }
}

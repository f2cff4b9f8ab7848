use anyhow::anyhow;
use clap::ArgMatches;
use std::{fmt, str::FromStr};

use super::config::{Request, ToolConfig};
use crate::protocol::{
    modbus::{ClientError, ModbusClient},
    serial::{LineHandle, PortRegistry},
    tty,
};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONNECTION_FAILURE: i32 = 1;
pub const EXIT_INVALID_CONFIG: i32 = 2;

/// The three requests the tool can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModbusFunction {
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleRegister,
}

impl ModbusFunction {
    pub fn code(self) -> u8 {
        match self {
            ModbusFunction::ReadHoldingRegisters => 0x03,
            ModbusFunction::ReadInputRegisters => 0x04,
            ModbusFunction::WriteSingleRegister => 0x06,
        }
    }

    /// Failing requests exit with their function code.
    pub fn exit_code(self) -> i32 {
        i32::from(self.code())
    }
}

impl FromStr for ModbusFunction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "rh" => Ok(ModbusFunction::ReadHoldingRegisters),
            "ri" => Ok(ModbusFunction::ReadInputRegisters),
            "w" => Ok(ModbusFunction::WriteSingleRegister),
            other => Err(anyhow!("Invalid function: {other} (expected rh, ri or w)")),
        }
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModbusFunction::ReadHoldingRegisters => write!(f, "rh"),
            ModbusFunction::ReadInputRegisters => write!(f, "ri"),
            ModbusFunction::WriteSingleRegister => write!(f, "w"),
        }
    }
}

/// Run one invocation and return the process exit code.
pub fn run(matches: &ArgMatches) -> i32 {
    if matches.get_flag("list-ports") {
        for port in tty::available_ports_sorted() {
            println!("{}", tty::describe_port(&port));
        }
        return EXIT_SUCCESS;
    }

    let verbose = matches.get_flag("verbose");
    let settings = match ToolConfig::from_matches(matches).and_then(|config| config.resolve()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Configuration error: {err:#}");
            return EXIT_INVALID_CONFIG;
        }
    };

    let handle = LineHandle::new(settings.address, PortRegistry::global())
        .with_rs485(settings.rs485)
        .with_timeout(settings.timeout);
    run_with_handle(&handle, &settings.request, verbose)
}

/// Connect, execute, close.
pub fn run_with_handle(handle: &LineHandle, request: &Request, verbose: bool) -> i32 {
    if verbose {
        println!("Opening {}", handle.address());
    }
    if let Err(err) = handle.connect() {
        println!("Connection error: {err}");
        return EXIT_CONNECTION_FAILURE;
    }

    let code = execute(handle, request, verbose);

    if let Err(err) = handle.close() {
        log::warn!("Failed to close {}: {err}", handle.address());
    }
    code
}

/// Issue `request` on an already connected handle.
pub fn execute(handle: &LineHandle, request: &Request, verbose: bool) -> i32 {
    let client = ModbusClient::new(handle, request.client_id);
    let function = request.function;

    if verbose {
        match function {
            ModbusFunction::WriteSingleRegister => println!(
                "Executing writing function {}. address {} value {}",
                function.code(),
                request.address,
                request.value
            ),
            _ => println!(
                "Executing reading function {}. address {}",
                function.code(),
                request.address
            ),
        }
    }

    let result: Result<Vec<u16>, ClientError> = match function {
        ModbusFunction::ReadHoldingRegisters => {
            client.read_holding_registers(request.address, request.count)
        }
        ModbusFunction::ReadInputRegisters => {
            client.read_input_registers(request.address, request.count)
        }
        ModbusFunction::WriteSingleRegister => client
            .write_single_register(request.address, request.value)
            .map(|echoed| vec![echoed]),
    };

    if verbose {
        match &result {
            Ok(values) => println!("Result: {values:?} (error: none)"),
            Err(err) => println!("Result: [] (error: {err})"),
        }
    }

    match result {
        Ok(values) => {
            if !verbose {
                let line = values
                    .iter()
                    .map(u16::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{line}");
            }
            EXIT_SUCCESS
        }
        Err(err) => {
            log::error!("Function {} ({function}) failed: {err}", function.code());
            if !verbose {
                eprintln!("Request failed: {err}");
            }
            function.exit_code()
        }
    }
}

pub mod actions;
pub mod config;

use clap::{Arg, ArgAction, ArgMatches, Command};

/// Command definition, kept separate from parsing so tests can feed argv.
pub fn build_command() -> Command {
    Command::new("modbustool")
        .about("Send one Modbus RTU request over a serial line and print the result")
        .arg(
            Arg::new("verbose")
                .short('V')
                .help("Print the executed request and its result")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML file with line, rs485 and request settings")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .short('l')
                .help("List all available serial ports and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .help("Serial device [default: /dev/ttyUSB0]")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("baud")
                .long("baud")
                .help("Baud rate [default: 9600]")
                .value_name("BAUD")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("data")
                .long("data")
                .help("Data bits [default: 8]")
                .value_name("BITS")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("stop")
                .long("stop")
                .help("Stop bits [default: 1]")
                .value_name("BITS")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("parity")
                .long("parity")
                .help("Parity (N/E/O) [default: N]")
                .value_name("PARITY"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Response timeout in milliseconds [default: 5000]")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("enable_rs485")
                .long("enable_rs485")
                .help("Drive RTS around each transmission (RS-485 half duplex)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rtshighduring")
                .long("rtshighduring")
                .help("RTS high while sending")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rtshighafter")
                .long("rtshighafter")
                .help("RTS high after sending")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("delayduringsend")
                .long("delayduringsend")
                .help("Delay between raising RTS and sending, in milliseconds [default: 0]")
                .value_name("MS")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("delayaftersend")
                .long("delayaftersend")
                .help("Delay between end of send and restoring RTS, in milliseconds [default: 0]")
                .value_name("MS")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("client")
                .short('c')
                .help("Client (slave) address [default: 1]")
                .value_name("ID")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("function")
                .short('f')
                .help("rh - Read Holding Register (3), ri - Read Input Register (4), w - Write Single Register (6) [default: ri]")
                .value_name("FUNCTION")
                .value_parser(["rh", "ri", "w"]),
        )
        .arg(
            Arg::new("address")
                .short('a')
                .help("Register address [default: 7]")
                .value_name("ADDR")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("value")
                .short('v')
                .help("Value of the register to be written [default: 0]")
                .value_name("VALUE")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .help("Number of registers to read [default: 1]")
                .value_name("N")
                .value_parser(clap::value_parser!(u16)),
        )
}

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}

/// `RUST_LOG` wins; otherwise `-V` selects debug output and the default is warnings only.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

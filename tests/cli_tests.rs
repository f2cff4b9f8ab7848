use std::process::Command;

fn modbustool() -> Command {
    Command::new(env!("CARGO_BIN_EXE_modbustool"))
}

/// Basic smoke tests for CLI functionality
#[test]
fn test_cli_help() {
    let output = modbustool()
        .arg("--help")
        .output()
        .expect("Failed to execute modbustool binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: modbustool"));
    assert!(stdout.contains("--enable_rs485"));
}

#[test]
fn test_cli_list_ports() {
    let output = modbustool()
        .arg("--list-ports")
        .output()
        .expect("Failed to execute modbustool binary");

    assert!(output.status.success());
}

#[test]
fn test_cli_missing_device_is_connection_failure() {
    let output = modbustool()
        .args(["--device", "/dev/modbustool-no-such-device", "-f", "rh"])
        .output()
        .expect("Failed to execute modbustool binary");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Connection error"));
}

#[test]
fn test_cli_negative_delay_is_config_error() {
    let output = modbustool()
        .args(["--enable_rs485", "--delayduringsend", "-3"])
        .output()
        .expect("Failed to execute modbustool binary");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_unreadable_config_is_config_error() {
    let output = modbustool()
        .args(["--config", "/nonexistent/modbustool.toml"])
        .output()
        .expect("Failed to execute modbustool binary");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Configuration error"));
}

pub mod modbus;
pub mod serial;
pub mod tty;

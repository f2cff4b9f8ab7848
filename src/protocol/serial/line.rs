use parking_lot::Mutex;
use std::{
    io::{self, Read, Write},
    sync::Arc,
    time::Duration,
};

use super::{DeviceAddress, Result, TransportError, DEFAULT_RESPONSE_TIMEOUT};

/// Byte-level view of an open serial line plus the control signals the
/// transport needs.
pub trait SerialLine: Read + Write + Send {
    /// Drive the RTS signal high (`true`) or low (`false`).
    fn set_request_to_send(&mut self, level: bool) -> io::Result<()>;

    /// Upper bound for the next blocking read.
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl SerialLine for Box<dyn serialport::SerialPort> {
    fn set_request_to_send(&mut self, level: bool) -> io::Result<()> {
        self.write_request_to_send(level).map_err(io::Error::from)
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        serialport::SerialPort::set_timeout(&mut **self, timeout).map_err(io::Error::from)
    }
}

/// Performs the physical open for a [`DeviceAddress`].
pub trait PortOpener: Send + Sync {
    fn open(&self, address: &DeviceAddress) -> Result<Box<dyn SerialLine>>;
}

/// Opens real device nodes through `serialport`, with exclusive access on Unix.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl PortOpener for SystemOpener {
    fn open(&self, address: &DeviceAddress) -> Result<Box<dyn SerialLine>> {
        address.validate()?;
        let builder = serialport::new(address.path.as_str(), address.baud)
            .timeout(DEFAULT_RESPONSE_TIMEOUT);
        let builder = address.apply_builder(builder)?;
        let open_error = |source: serialport::Error| TransportError::Open {
            path: address.path.clone(),
            source,
        };

        #[cfg(unix)]
        {
            let mut handle = builder.open_native().map_err(open_error)?;
            handle.set_exclusive(true).map_err(open_error)?;
            let port: Box<dyn serialport::SerialPort> = Box::new(handle);
            Ok(Box::new(port))
        }

        #[cfg(not(unix))]
        {
            let port = builder.open().map_err(open_error)?;
            Ok(Box::new(port))
        }
    }
}

/// One physically open line, shared by every handle with the same address key.
pub struct Connection {
    key: String,
    line: Mutex<Option<Box<dyn SerialLine>>>,
}

pub type SharedConnection = Arc<Connection>;

impl Connection {
    pub(crate) fn new(key: String, line: Box<dyn SerialLine>) -> Self {
        Self {
            key,
            line: Mutex::new(Some(line)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_open(&self) -> bool {
        self.line.lock().is_some()
    }

    /// Drop the underlying line, which closes the device. Returns whether it was open.
    pub(crate) fn close(&self) -> bool {
        self.line.lock().take().is_some()
    }

    /// Run `op` with exclusive access to the line.
    pub(crate) fn with_line<R>(
        &self,
        op: impl FnOnce(&mut dyn SerialLine) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self.line.lock();
        let line = guard.as_deref_mut().ok_or(TransportError::NotConnected)?;
        op(line)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("key", &self.key)
            .field("open", &self.is_open())
            .finish()
    }
}

//! Scripted in-memory serial line for unit tests.

use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use super::{DeviceAddress, PortOpener, Result, SerialLine, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Rts(bool),
    Write(Vec<u8>),
    Flush,
    Closed,
}

/// Shared view of everything that happened on the mock lines of one opener.
#[derive(Clone, Default)]
pub struct LineRecorder {
    timeline: Arc<Mutex<Vec<(Instant, LineEvent)>>>,
    incoming: Arc<Mutex<VecDeque<u8>>>,
    fail_writes: Arc<AtomicBool>,
}

impl LineRecorder {
    fn record(&self, event: LineEvent) {
        self.timeline.lock().push((Instant::now(), event));
    }

    pub fn events(&self) -> Vec<LineEvent> {
        self.timeline.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn timeline(&self) -> Vec<(Instant, LineEvent)> {
        self.timeline.lock().clone()
    }

    pub fn written(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LineEvent::Write(bytes) => Some(bytes),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Make every following write fail as if the device was unplugged.
    pub fn set_write_failing(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Queue bytes the slave "sends back".
    pub fn feed(&self, bytes: &[u8]) {
        self.incoming.lock().extend(bytes.iter().copied());
    }
}

pub struct MockLine {
    recorder: LineRecorder,
    timeout: Duration,
}

impl Read for MockLine {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut incoming = self.recorder.incoming.lock();
        if incoming.is_empty() {
            drop(incoming);
            thread::sleep(self.timeout);
            return Err(io::Error::new(io::ErrorKind::TimedOut, "mock read timed out"));
        }
        let n = buf.len().min(incoming.len());
        for (slot, byte) in buf.iter_mut().zip(incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.recorder.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failed"));
        }
        self.recorder.record(LineEvent::Write(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.recorder.record(LineEvent::Flush);
        Ok(())
    }
}

impl SerialLine for MockLine {
    fn set_request_to_send(&mut self, level: bool) -> io::Result<()> {
        self.recorder.record(LineEvent::Rts(level));
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }
}

impl Drop for MockLine {
    fn drop(&mut self) {
        self.recorder.record(LineEvent::Closed);
    }
}

/// Opener handing out [`MockLine`]s and counting physical opens.
#[derive(Clone, Default)]
pub struct ScriptedOpener {
    pub recorder: LineRecorder,
    opens: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl ScriptedOpener {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn closes(&self) -> usize {
        self.recorder
            .events()
            .iter()
            .filter(|e| **e == LineEvent::Closed)
            .count()
    }
}

impl PortOpener for ScriptedOpener {
    fn open(&self, address: &DeviceAddress) -> Result<Box<dyn SerialLine>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Open {
                path: address.path.clone(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "no such device"),
            });
        }
        Ok(Box::new(MockLine {
            recorder: self.recorder.clone(),
            timeout: super::DEFAULT_RESPONSE_TIMEOUT,
        }))
    }
}

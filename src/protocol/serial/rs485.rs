use std::{io::Write, thread, time::Duration};

use super::{Result, SerialLine, TransportError};

/// RTS direction control for half-duplex RS-485 lines.
///
/// When enabled, a send is framed as: RTS to `rts_high_during_send`, wait
/// `delay_before_send`, write and drain, wait `delay_after_send`, RTS to
/// `rts_high_after_send`. The waits block the writing thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rs485Config {
    pub enabled: bool,
    pub rts_high_during_send: bool,
    pub rts_high_after_send: bool,
    pub delay_before_send: Duration,
    pub delay_after_send: Duration,
}

impl Rs485Config {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build from signed millisecond delays as they arrive from the command line.
    pub fn from_millis(
        enabled: bool,
        rts_high_during_send: bool,
        rts_high_after_send: bool,
        delay_before_send_ms: i64,
        delay_after_send_ms: i64,
    ) -> Result<Self> {
        Ok(Self {
            enabled,
            rts_high_during_send,
            rts_high_after_send,
            delay_before_send: non_negative_millis("pre-send delay", delay_before_send_ms)?,
            delay_after_send: non_negative_millis("post-send delay", delay_after_send_ms)?,
        })
    }

    /// Write `bytes` to `line`, toggling RTS around the write when enabled.
    pub fn transmit(&self, line: &mut dyn SerialLine, bytes: &[u8]) -> Result<usize> {
        if !self.enabled {
            line.write_all(bytes)?;
            line.flush()?;
            return Ok(bytes.len());
        }

        log::trace!("RTS {} before send", level_name(self.rts_high_during_send));
        line.set_request_to_send(self.rts_high_during_send)?;
        pause(self.delay_before_send);

        // Flush drains the output queue so the post-send delay starts after the last bit.
        let sent = line.write_all(bytes).and_then(|_| line.flush());
        if let Err(err) = sent {
            // Leave the transceiver in its idle direction even when the write failed.
            if let Err(rts_err) = line.set_request_to_send(self.rts_high_after_send) {
                log::warn!("Failed to restore RTS after write error: {rts_err}");
            }
            return Err(err.into());
        }

        pause(self.delay_after_send);
        log::trace!("RTS {} after send", level_name(self.rts_high_after_send));
        line.set_request_to_send(self.rts_high_after_send)?;
        Ok(bytes.len())
    }
}

fn non_negative_millis(name: &str, value: i64) -> Result<Duration> {
    u64::try_from(value)
        .map(Duration::from_millis)
        .map_err(|_| TransportError::Config(format!("{name} must not be negative, got {value}ms")))
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

fn level_name(high: bool) -> &'static str {
    if high {
        "high"
    } else {
        "low"
    }
}

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

use super::{Connection, DeviceAddress, PortOpener, Result, SharedConnection, SystemOpener};

static GLOBAL_REGISTRY: Lazy<Arc<PortRegistry>> = Lazy::new(|| Arc::new(PortRegistry::new()));

struct Entry {
    connection: SharedConnection,
    holders: usize,
}

/// Table of open serial lines keyed by [`DeviceAddress::key`].
///
/// A device is opened once no matter how many handles refer to it. Each
/// successful [`acquire`](Self::acquire) must be paired with a
/// [`release`](Self::release); the line is closed when the last holder
/// releases it.
pub struct PortRegistry {
    opener: Box<dyn PortOpener>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::with_opener(SystemOpener)
    }

    pub fn with_opener(opener: impl PortOpener + 'static) -> Self {
        Self {
            opener: Box::new(opener),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide registry backed by the system opener.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Return the open line for `address`, opening it on first use.
    pub fn acquire(&self, address: &DeviceAddress) -> Result<SharedConnection> {
        let key = address.key();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(&key) {
            entry.holders += 1;
            log::debug!("Reusing serial port {key} ({} holders)", entry.holders);
            return Ok(Arc::clone(&entry.connection));
        }

        log::info!("Opening serial port {key}");
        let line = self.opener.open(address).inspect_err(|err| {
            log::warn!("Failed to open serial port {key}: {err}");
        })?;
        let connection = Arc::new(Connection::new(key.clone(), line));
        entries.insert(
            key,
            Entry {
                connection: Arc::clone(&connection),
                holders: 1,
            },
        );
        Ok(connection)
    }

    /// Drop one holder of `connection`. Returns `true` when the line was closed.
    pub fn release(&self, address: &DeviceAddress, connection: &SharedConnection) -> bool {
        let key = address.key();
        {
            let mut entries = self.entries.lock();
            let registered = match entries.get_mut(&key) {
                Some(entry) if Arc::ptr_eq(&entry.connection, connection) => {
                    entry.holders = entry.holders.saturating_sub(1);
                    if entry.holders > 0 {
                        log::debug!("Released serial port {key} ({} holders left)", entry.holders);
                        return false;
                    }
                    true
                }
                _ => {
                    log::warn!("Releasing serial port {key} that is no longer registered");
                    false
                }
            };
            if registered {
                entries.remove(&key);
            }
        }

        log::info!("Closing serial port {key}");
        connection.close()
    }

    pub fn contains(&self, address: &DeviceAddress) -> bool {
        self.entries.lock().contains_key(&address.key())
    }

    /// Number of handles currently holding `address`.
    pub fn holders(&self, address: &DeviceAddress) -> usize {
        self.entries
            .lock()
            .get(&address.key())
            .map_or(0, |entry| entry.holders)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::serial::{testing::ScriptedOpener, TransportError};

    #[test]
    fn acquire_opens_once_per_address() {
        let opener = ScriptedOpener::default();
        let registry = PortRegistry::with_opener(opener.clone());
        let addr = DeviceAddress::new("/dev/ttyUSB0");

        let first = registry.acquire(&addr).unwrap();
        let second = registry.acquire(&addr).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(opener.opens(), 1);
        assert_eq!(registry.holders(&addr), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_framing_is_a_different_entry() {
        let opener = ScriptedOpener::default();
        let registry = PortRegistry::with_opener(opener.clone());
        let a = DeviceAddress::new("/dev/ttyUSB0");
        let b = DeviceAddress::new("/dev/ttyUSB0").with_baud(19200);

        let ca = registry.acquire(&a).unwrap();
        let cb = registry.acquire(&b).unwrap();

        assert!(!Arc::ptr_eq(&ca, &cb));
        assert_eq!(opener.opens(), 2);
        assert_eq!(registry.len(), 2);

        let c = DeviceAddress::new("/dev/ttyUSB0").with_framing(8, serialport::Parity::Even, 1);
        let cc = registry.acquire(&c).unwrap();
        assert!(!Arc::ptr_eq(&ca, &cc));
        assert_eq!(opener.opens(), 3);
        assert_eq!(registry.holders(&a), 1);
    }

    #[test]
    fn failed_open_stores_nothing() {
        let opener = ScriptedOpener::default();
        opener.set_failing(true);
        let registry = PortRegistry::with_opener(opener.clone());
        let addr = DeviceAddress::new("/dev/missing");

        let err = registry.acquire(&addr).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(registry.is_empty());

        opener.set_failing(false);
        registry.acquire(&addr).unwrap();
        assert_eq!(opener.opens(), 2);
        assert!(registry.contains(&addr));
    }

    #[test]
    fn last_release_closes_and_evicts() {
        let opener = ScriptedOpener::default();
        let registry = PortRegistry::with_opener(opener.clone());
        let addr = DeviceAddress::new("/dev/ttyUSB0");

        let first = registry.acquire(&addr).unwrap();
        let second = registry.acquire(&addr).unwrap();

        assert!(!registry.release(&addr, &first));
        assert!(second.is_open());
        assert_eq!(opener.closes(), 0);

        assert!(registry.release(&addr, &second));
        assert!(!second.is_open());
        assert!(!registry.contains(&addr));
        assert_eq!(opener.closes(), 1);

        let reopened = registry.acquire(&addr).unwrap();
        assert!(!Arc::ptr_eq(&reopened, &second));
        assert_eq!(opener.opens(), 2);
    }

    #[test]
    fn stale_release_leaves_current_entry_alone() {
        let opener = ScriptedOpener::default();
        let registry = PortRegistry::with_opener(opener.clone());
        let addr = DeviceAddress::new("/dev/ttyUSB0");

        let old = registry.acquire(&addr).unwrap();
        registry.release(&addr, &old);
        let current = registry.acquire(&addr).unwrap();

        // Releasing the already-closed connection again must not touch the new one.
        assert!(!registry.release(&addr, &old));
        assert!(current.is_open());
        assert_eq!(registry.holders(&addr), 1);
    }
}

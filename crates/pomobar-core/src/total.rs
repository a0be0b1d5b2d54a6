//! The cumulative total of completed minutes and its persistence adapter.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::KvStore;

/// Key holding the total, as a base-10 integer string.
pub const TOTAL_KEY: &str = "total_minutes";

/// Sum of nominal minutes over all completed sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeTotal {
    pub minutes: u64,
}

impl CumulativeTotal {
    pub fn add(&mut self, minutes: u64) {
        self.minutes = self.minutes.saturating_add(minutes);
    }

    pub fn reset(&mut self) {
        self.minutes = 0;
    }
}

/// Durable home of the cumulative total.
///
/// The engine calls `load_total` once when it is built and the other two
/// only on completion and clear, never on the tick path.
pub trait TotalStore: Send {
    /// `None` means no total has been saved yet.
    fn load_total(&self) -> Result<Option<u64>, StorageError>;
    fn save_total(&self, minutes: u64) -> Result<(), StorageError>;
    fn clear_total(&self) -> Result<(), StorageError>;
}

/// Stores the total under [`TOTAL_KEY`] in any key-value store.
#[derive(Debug, Clone)]
pub struct KvTotalStore<K> {
    kv: K,
}

impl<K: KvStore> KvTotalStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }
}

impl<K: KvStore + Send> TotalStore for KvTotalStore<K> {
    fn load_total(&self) -> Result<Option<u64>, StorageError> {
        match self.kv.get(TOTAL_KEY)? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| StorageError::Corrupt {
                    key: TOTAL_KEY.into(),
                    value: raw,
                }),
        }
    }

    fn save_total(&self, minutes: u64) -> Result<(), StorageError> {
        self.kv.set(TOTAL_KEY, &minutes.to_string())
    }

    fn clear_total(&self) -> Result<(), StorageError> {
        self.kv.remove(TOTAL_KEY)
    }
}

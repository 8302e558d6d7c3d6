//! In-memory State Store
//!
//! Keeps the encoded row in memory, going through the same codec as the
//! SQLite store. Can be switched offline to simulate an unreachable store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{StateStore, StoreError, StoredRow};
use crate::grid::state::GridState;

/// Volatile store, for tests and throwaway servers.
#[derive(Default)]
pub struct MemoryStore {
    row: Mutex<Option<StoredRow>>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Empty store; loads return the default grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a raw row.
    pub fn with_row(row: StoredRow) -> Self {
        Self {
            row: Mutex::new(Some(row)),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<GridState, StoreError> {
        self.check_online()?;
        let row = self.row.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(row.clone().map(StoredRow::decode).unwrap_or_default())
    }

    fn save(&self, state: &GridState) -> Result<(), StoreError> {
        self.check_online()?;
        let encoded = StoredRow::encode(state)?;
        *self.row.lock().map_err(|_| StoreError::Poisoned)? = Some(encoded);
        Ok(())
    }
}

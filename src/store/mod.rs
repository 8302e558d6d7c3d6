//! State Store
//!
//! Persists the single grid state row.
//!
//! - `load` always yields a state: the default grid when no row exists yet.
//! - `save` overwrites the row with one statement.
//! - `blocked` / `names` are stored as JSON text. Malformed text decodes to an
//!   empty collection (with a warning) instead of failing the load.

pub mod inspect;
pub mod memory;
pub mod sqlite;

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::warn;

use crate::core::coord::Coord;
use crate::grid::state::{GridState, MAX_GRID_DIMENSION};

pub use inspect::{inspect_path, write_report};
pub use memory::MemoryStore;
pub use sqlite::{resolve_db_path, SqliteStore};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Encoding the state failed.
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),

    /// I/O error while preparing the database file.
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    /// A previous holder of the connection panicked.
    #[error("store lock poisoned")]
    Poisoned,

    /// Backend refuses the operation (read-only or switched off).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable home of the grid state.
pub trait StateStore: Send + Sync {
    /// Read the state, or the default state if nothing was saved yet.
    fn load(&self) -> Result<GridState, StoreError>;

    /// Overwrite the stored state.
    fn save(&self, state: &GridState) -> Result<(), StoreError>;
}

/// The row as persisted: dimensions plus two JSON text columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRow {
    /// Stored row count (may be out of range in a hand-edited database).
    pub rows: i64,
    /// Stored column count.
    pub cols: i64,
    /// JSON array of coordinate strings.
    pub blocked: Option<String>,
    /// JSON object of number string -> label.
    pub names: Option<String>,
}

impl StoredRow {
    /// Encode a state for storage.
    pub fn encode(state: &GridState) -> Result<Self, StoreError> {
        Ok(Self {
            rows: i64::from(state.rows),
            cols: i64::from(state.cols),
            blocked: Some(serde_json::to_string(&state.blocked)?),
            names: Some(serde_json::to_string(&state.names)?),
        })
    }

    /// Decode a stored row. Never fails: bad fields fall back to empty.
    pub fn decode(self) -> GridState {
        GridState {
            rows: dimension(self.rows),
            cols: dimension(self.cols),
            blocked: decode_blocked(self.blocked.as_deref()),
            names: decode_names(self.names.as_deref()),
        }
        .normalized()
    }
}

/// Dimensions outside `0..=MAX_GRID_DIMENSION` decode as 0.
fn dimension(value: i64) -> u32 {
    match u32::try_from(value) {
        Ok(n) if n <= MAX_GRID_DIMENSION => n,
        _ => {
            warn!(value, "stored grid dimension out of range, using 0");
            0
        }
    }
}

/// Decode the `blocked` column. Empty on missing or malformed text.
pub fn decode_blocked(text: Option<&str>) -> BTreeSet<Coord> {
    match text {
        None => BTreeSet::new(),
        Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            warn!(error = %e, "stored blocked list is malformed, using empty");
            BTreeSet::new()
        }),
    }
}

/// Decode the `names` column. Empty on missing or malformed text.
pub fn decode_names(text: Option<&str>) -> BTreeMap<u32, String> {
    match text {
        None => BTreeMap::new(),
        Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            warn!(error = %e, "stored names map is malformed, using empty");
            BTreeMap::new()
        }),
    }
}

//! SQLite State Store
//!
//! One table, one row (`id = 1`). Writes are a single upsert statement, so
//! readers never observe a half-written state.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use super::{StateStore, StoreError, StoredRow};
use crate::grid::state::{GridState, DEFAULT_COLS, DEFAULT_ROWS};

/// First 16 bytes of every SQLite database file.
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Upper bound on waiting for a locked database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS state (
    id INTEGER PRIMARY KEY,
    rows INTEGER,
    cols INTEGER,
    blocked TEXT,
    names TEXT
)";

/// Grid state persisted in a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    read_only: bool,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the state row exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!("Opened state database {}", path.display());
        Self::initialize(conn)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    /// Open an existing database without ever writing to it.
    pub fn open_readonly(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Mutex::new(conn),
            read_only: true,
        })
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO state (id, rows, cols, blocked, names) VALUES (1, ?1, ?2, '[]', '{}')",
            params![DEFAULT_ROWS, DEFAULT_COLS],
        )?;
        if inserted > 0 {
            info!("Seeded default {}x{} grid", DEFAULT_ROWS, DEFAULT_COLS);
        }

        Ok(Self {
            conn: Mutex::new(conn),
            read_only: false,
        })
    }

    /// Fetch the raw row, if present.
    pub fn load_row(&self) -> Result<Option<StoredRow>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let row = conn
            .query_row(
                "SELECT rows, cols, blocked, names FROM state WHERE id = 1",
                [],
                |row| {
                    Ok(StoredRow {
                        rows: row.get::<_, Option<i64>>(0)?.unwrap_or(i64::from(DEFAULT_ROWS)),
                        cols: row.get::<_, Option<i64>>(1)?.unwrap_or(i64::from(DEFAULT_COLS)),
                        blocked: row.get(2)?,
                        names: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

impl StateStore for SqliteStore {
    fn load(&self) -> Result<GridState, StoreError> {
        match self.load_row()? {
            Some(row) => Ok(row.decode()),
            None => {
                debug!("No state row, using default grid");
                Ok(GridState::default())
            }
        }
    }

    fn save(&self, state: &GridState) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::Unavailable("database opened read-only".into()));
        }

        let row = StoredRow::encode(state)?;
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO state (id, rows, cols, blocked, names) VALUES (1, ?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                rows = excluded.rows,
                cols = excluded.cols,
                blocked = excluded.blocked,
                names = excluded.names",
            params![row.rows, row.cols, row.blocked, row.names],
        )?;
        Ok(())
    }
}

/// Check for the SQLite file header.
pub fn is_sqlite_file(path: &Path) -> bool {
    let mut header = [0u8; 16];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut header))
        .map(|_| &header == SQLITE_HEADER)
        .unwrap_or(false)
}

/// Pick the database file to use.
///
/// Prefers `primary` when it is a valid database, then `fallback`. When
/// neither is, returns `primary`, first deleting a non-database placeholder
/// file sitting there so SQLite can create a fresh one.
pub fn resolve_db_path(primary: &Path, fallback: &Path) -> Result<PathBuf, StoreError> {
    if is_sqlite_file(primary) {
        return Ok(primary.to_path_buf());
    }
    if is_sqlite_file(fallback) {
        info!("Using fallback database {}", fallback.display());
        return Ok(fallback.to_path_buf());
    }
    if primary.is_file() {
        warn!("Removing non-SQLite placeholder {}", primary.display());
        std::fs::remove_file(primary)?;
    }
    Ok(primary.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::Coord;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_database_has_default_state() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.load().unwrap(), GridState::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut state = GridState::empty(5, 4);
        state.blocked.insert(Coord::new(4, 0));
        state.blocked.insert(Coord::new(2, 3));
        state.names.insert(1, "Rice".into());
        state.names.insert(17, "Tea \"green\"".into());

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);

        // Overwrite, not append
        store.save(&GridState::empty(1, 1)).unwrap();
        assert_eq!(store.load().unwrap(), GridState::empty(1, 1));
    }

    #[test]
    fn test_corrupt_columns_load_as_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "UPDATE state SET rows = 2, cols = 2, blocked = 'oops', names = '{\"1\":\"Oil\"}' WHERE id = 1",
                [],
            )
            .unwrap();
        }

        let state = store.load().unwrap();
        assert_eq!((state.rows, state.cols), (2, 2));
        assert!(state.blocked.is_empty());
        assert_eq!(state.label(1), Some("Oil"));
    }

    #[test]
    fn test_missing_row_loads_default() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute("DELETE FROM state", []).unwrap();
        }
        assert_eq!(store.load().unwrap(), GridState::default());

        // Save recreates the row
        store.save(&GridState::empty(2, 6)).unwrap();
        assert_eq!(store.load().unwrap(), GridState::empty(2, 6));
    }

    #[test]
    fn test_file_store_and_readonly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.sqlite");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save(&GridState::empty(2, 3)).unwrap();
        }
        assert!(is_sqlite_file(&path));

        let reader = SqliteStore::open_readonly(&path).unwrap();
        assert_eq!(reader.load().unwrap(), GridState::empty(2, 3));
        assert!(matches!(
            reader.save(&GridState::default()),
            Err(StoreError::Unavailable(_))
        ));

    }

    #[test]
    fn test_resolve_db_path() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("primary.sqlite");
        let fallback = dir.path().join("fallback.sqlite");

        // Nothing exists: primary
        assert_eq!(resolve_db_path(&primary, &fallback).unwrap(), primary);

        // Placeholder text at primary, valid fallback: fallback
        std::fs::write(&primary, "placeholder").unwrap();
        SqliteStore::open(&fallback).unwrap();
        assert_eq!(resolve_db_path(&primary, &fallback).unwrap(), fallback);
        assert!(primary.exists());

        // Valid primary wins
        std::fs::remove_file(&primary).unwrap();
        SqliteStore::open(&primary).unwrap();
        assert_eq!(resolve_db_path(&primary, &fallback).unwrap(), primary);

        // Neither valid: placeholder at primary is removed
        std::fs::remove_file(&fallback).unwrap();
        std::fs::write(&primary, "placeholder").unwrap();
        assert_eq!(resolve_db_path(&primary, &fallback).unwrap(), primary);
        assert!(!primary.exists());
    }
}

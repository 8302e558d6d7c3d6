//! Read-only dump of a state database.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::sqlite::{is_sqlite_file, SqliteStore};
use super::StoreError;

/// Database to inspect: the first of `primary` and `fallback` that is a
/// SQLite file, else `primary`. Never removes anything.
pub fn inspect_path(primary: &Path, fallback: &Path) -> PathBuf {
    if !is_sqlite_file(primary) && is_sqlite_file(fallback) {
        fallback.to_path_buf()
    } else {
        primary.to_path_buf()
    }
}

/// Write the raw row and a text rendering of the grid stored at `path`.
pub fn write_report<W: Write>(path: &Path, out: &mut W) -> Result<(), StoreError> {
    let store = SqliteStore::open_readonly(path)?;

    let Some(row) = store.load_row()? else {
        writeln!(out, "No state row found.")?;
        return Ok(());
    };

    writeln!(out, "Database: {}", path.display())?;
    writeln!(out, "rows:    {}", row.rows)?;
    writeln!(out, "cols:    {}", row.cols)?;
    writeln!(out, "blocked: {}", row.blocked.as_deref().unwrap_or("[]"))?;
    writeln!(out, "names:   {}", row.names.as_deref().unwrap_or("{}"))?;
    writeln!(out)?;
    writeln!(out, "{}", row.decode().render_text())?;
    Ok(())
}

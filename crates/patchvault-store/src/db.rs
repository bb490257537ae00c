//! Connections to a patch library
//!
//! The ingestion worker writes while the interactive side reads, so a library
//! on disk runs in WAL mode and waits out a short lock instead of failing.

use crate::errors::{from_rusqlite, io_error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// How long a statement waits for a competing writer
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a library lives
#[derive(Debug, Clone, Copy)]
pub enum Location<'a> {
    File(&'a Path),
    /// Discarded with the connection
    Memory,
}

/// Open a library connection with foreign keys enforced
///
/// A file location gets its parent directories created and switches to WAL.
pub fn connect(location: Location<'_>) -> Result<Connection> {
    let conn = match location {
        Location::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| io_error("open_library", e))?;
            }
            Connection::open(path)
        }
        Location::Memory => Connection::open_in_memory(),
    }
    .map_err(from_rusqlite)?;

    conn.busy_timeout(BUSY_TIMEOUT).map_err(from_rusqlite)?;
    conn.execute("PRAGMA foreign_keys = ON", [])
        .map_err(from_rusqlite)?;

    if let Location::File(_) = location {
        // answers with the resulting mode
        let _mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        conn.execute("PRAGMA synchronous = NORMAL", [])
            .map_err(from_rusqlite)?;
    }

    Ok(conn)
}

pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Embedded store for the gallery collections: memories, stories, coupons,
/// site content, love reasons and the single admin account.
///
/// One connection behind a mutex. Handlers reach it through
/// `spawn_blocking`, so writes serialize here while WAL keeps readers
/// unblocked; the positional rank rewrite relies on that serialization.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file, apply pragmas and run the
    /// migrations. Reopening an existing file keeps every row; the schema
    /// and coupon seed are idempotent.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        // Ingest batches write row by row; wait out a busy reader instead
        // of surfacing SQLITE_BUSY as a failed file.
        conn.busy_timeout(Duration::from_secs(5))?;

        migrations::run(&conn)?;

        info!("Gallery database ready at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}

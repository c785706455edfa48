//! SQLite inventory storage.
//!
//! Persists products and the snapshot index in one local database:
//! - products: id, sku (unique), name, description, price, stock, threshold
//! - snapshots: id, file_name, created_at_micros, row_count, byte_len
//!
//! Every mutating operation runs in its own transaction, so a failed call
//! leaves the store as it was.

pub mod product;
pub mod snapshot_index;

use rusqlite::Connection;
use std::path::Path;

use crate::error::{InventoryError, Result};

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sku TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            price TEXT NOT NULL DEFAULT '0',
            stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
            reorder_threshold INTEGER NOT NULL DEFAULT 5 CHECK (reorder_threshold >= 0),
            last_adjustment TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name TEXT NOT NULL UNIQUE,
            created_at_micros INTEGER NOT NULL,
            row_count INTEGER NOT NULL,
            byte_len INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_products_stock ON products(stock)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_created ON snapshots(created_at_micros)",
        [],
    )?;

    Ok(())
}

/// Database handle. Open once per command, pass to every operation.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| InventoryError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Store { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

/// True when a SQLite error is a UNIQUE/CHECK constraint failure.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_parent_directory_and_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("inventory.db");

        let store = Store::open(&path).unwrap();
        assert!(path.exists());

        let tables: i64 = store
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('products', 'snapshots')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn reopening_keeps_existing_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.db");
        drop(Store::open(&path).unwrap());
        assert!(Store::open(&path).is_ok());
    }
}

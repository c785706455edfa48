//! Ordered index of historical snapshot files.
//!
//! Recency comes from the recorded timestamp, never from directory listing
//! order. `reconcile` brings the index back in line with the history
//! directory after files were pruned or restored by hand.

use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::Store;
use crate::error::{InventoryError, Result};
use crate::snapshot::{self, csv_format};

/// Snapshot metadata stored in database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord {
    pub id: i64,
    pub file_name: String,
    pub created_at_micros: i64,
    pub row_count: u64,
    pub byte_len: u64,
}

impl SnapshotRecord {
    pub fn path_in(&self, history_dir: &Path) -> PathBuf {
        history_dir.join(&self.file_name)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<String>,
    pub adopted: Vec<String>,
    /// CSV files in the history directory that are not valid snapshots.
    /// They stay on disk and out of the index.
    pub skipped: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && self.adopted.is_empty() && self.skipped.is_empty()
    }
}

const RECORD_COLUMNS: &str = "id, file_name, created_at_micros, row_count, byte_len";

impl Store {
    pub fn record_snapshot(
        &mut self,
        file_name: &str,
        created_at_micros: i64,
        row_count: u64,
        byte_len: u64,
    ) -> Result<SnapshotRecord> {
        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "INSERT INTO snapshots (file_name, created_at_micros, row_count, byte_len)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                file_name,
                created_at_micros,
                i64::try_from(row_count).unwrap_or(i64::MAX),
                i64::try_from(byte_len).unwrap_or(i64::MAX)
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(SnapshotRecord {
            id,
            file_name: file_name.to_string(),
            created_at_micros,
            row_count,
            byte_len,
        })
    }

    /// All snapshots, newest first.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        self.query_snapshots(None)
    }

    /// The `n` most recent snapshots, newest first.
    pub fn latest_snapshots(&self, n: usize) -> Result<Vec<SnapshotRecord>> {
        self.query_snapshots(Some(n))
    }

    pub fn get_snapshot(&self, id: i64) -> Result<Option<SnapshotRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM snapshots WHERE id = ?1");
        let record = self
            .conn()
            .query_row(&sql, params![id], record_from_row)
            .optional()?;
        Ok(record)
    }

    pub fn remove_snapshot(&mut self, id: i64) -> Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM snapshots WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn query_snapshots(&self, limit: Option<usize>) -> Result<Vec<SnapshotRecord>> {
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM snapshots
             ORDER BY created_at_micros DESC, id DESC
             LIMIT ?1"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let records = stmt
            .query_map(params![limit], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Drop index entries whose file is gone and adopt CSV files the index
    /// does not know about.
    pub fn reconcile_snapshots(&mut self, history_dir: &Path) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for record in self.list_snapshots()? {
            if !record.path_in(history_dir).is_file() {
                self.remove_snapshot(record.id)?;
                tracing::info!(file = %record.file_name, "dropped pruned snapshot from index");
                report.removed.push(record.file_name);
            }
        }

        if !history_dir.is_dir() {
            return Ok(report);
        }

        let known: Vec<String> = self
            .list_snapshots()?
            .into_iter()
            .map(|r| r.file_name)
            .collect();

        let mut on_disk = Vec::new();
        for entry in WalkDir::new(history_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| history_dir.to_path_buf());
                InventoryError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else { continue };
            if name.ends_with(".csv") && !known.iter().any(|k| k == name) {
                on_disk.push((name.to_string(), entry.path().to_path_buf()));
            }
        }
        on_disk.sort();

        for (name, path) in on_disk {
            let bytes = std::fs::read(&path).map_err(|e| InventoryError::io(&path, e))?;
            let rows = match csv_format::parse_snapshot(&bytes, &path) {
                Ok(rows) => rows.len() as u64,
                Err(e) => {
                    tracing::debug!(file = %name, error = %e, "skipping unreadable snapshot file");
                    report.skipped.push(name);
                    continue;
                }
            };

            let created = snapshot::timestamp_from_file_name(&name)
                .or_else(|| modified_micros(&path))
                .unwrap_or(0);

            self.record_snapshot(&name, created, rows, bytes.len() as u64)?;
            tracing::info!(file = %name, "adopted snapshot into index");
            report.adopted.push(name);
        }

        Ok(report)
    }
}

fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<SnapshotRecord> {
    Ok(SnapshotRecord {
        id: row.get(0)?,
        file_name: row.get(1)?,
        created_at_micros: row.get(2)?,
        row_count: row.get::<_, i64>(3)?.max(0) as u64,
        byte_len: row.get::<_, i64>(4)?.max(0) as u64,
    })
}

fn modified_micros(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    i64::try_from(since_epoch.as_micros()).ok()
}

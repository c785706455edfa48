//! Atomic snapshot export.
//!
//! Every file is written to a temp file in the target's own directory and
//! renamed into place, so readers see either the previous file or the new
//! one, never a partial write. A failed rename drops the temp file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::{NamedTempFile, PersistError};

use super::compare::{read_if_exists, QuickCheck};
use super::{csv_format, history_file_name, SnapshotRow};
use crate::config::Config;
use crate::error::{InventoryError, Result};
use crate::model::Product;
use crate::platform;
use crate::store::snapshot_index::SnapshotRecord;
use crate::store::Store;

const MAX_NAME_COLLISIONS: u32 = 1000;

/// Result of a successful export.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotHandle {
    pub current_path: PathBuf,
    pub history_path: PathBuf,
    pub record: SnapshotRecord,
    pub quick_check: QuickCheck,
}

pub struct SnapshotWriter {
    current: PathBuf,
    reference: PathBuf,
    history_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(current: PathBuf, reference: PathBuf, history_dir: PathBuf) -> Self {
        SnapshotWriter {
            current,
            reference,
            history_dir,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.current_snapshot.clone(),
            config.reference_snapshot.clone(),
            config.history_dir.clone(),
        )
    }

    pub fn current_path(&self) -> &Path {
        &self.current
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    pub fn write_snapshot(
        &self,
        store: &mut Store,
        products: &[Product],
    ) -> Result<SnapshotHandle> {
        self.write_snapshot_at(store, products, Utc::now())
    }

    /// Export `products` in the order given.
    ///
    /// 1. byte-compare the rendered export with the reference copy
    /// 2. replace the current export atomically
    /// 3. refresh the reference copy
    /// 4. file a timestamped copy in the history directory and index it
    ///
    /// If a step after 2 fails, the current export and reference copy are put
    /// back to their previous contents before the error is returned.
    pub fn write_snapshot_at(
        &self,
        store: &mut Store,
        products: &[Product],
        at: DateTime<Utc>,
    ) -> Result<SnapshotHandle> {
        let rows: Vec<SnapshotRow> = products.iter().map(SnapshotRow::from).collect();
        let bytes = csv_format::render_snapshot(&rows)?;

        let previous_current = read_if_exists(&self.current)?;
        let previous_reference = read_if_exists(&self.reference)?;
        let quick_check = QuickCheck::between(&bytes, previous_reference.as_deref());

        atomic_replace(&self.current, &bytes)?;

        let committed = atomic_replace(&self.reference, &bytes)
            .and_then(|()| self.file_history(store, &bytes, rows.len(), at));
        let (history_path, record) = match committed {
            Ok(filed) => filed,
            Err(e) => {
                restore(&self.current, previous_current.as_deref());
                restore(&self.reference, previous_reference.as_deref());
                return Err(e);
            }
        };

        tracing::info!(
            path = %self.current.display(),
            history = %record.file_name,
            rows = rows.len(),
            quick_check = ?quick_check,
            "snapshot written"
        );

        Ok(SnapshotHandle {
            current_path: self.current.clone(),
            history_path,
            record,
            quick_check,
        })
    }

    fn file_history(
        &self,
        store: &mut Store,
        bytes: &[u8],
        row_count: usize,
        at: DateTime<Utc>,
    ) -> Result<(PathBuf, SnapshotRecord)> {
        let history_path = write_history(&self.history_dir, &history_file_name(at), bytes)?;
        let file_name = history_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let recorded = store.record_snapshot(
            &file_name,
            at.timestamp_micros(),
            row_count as u64,
            bytes.len() as u64,
        );
        match recorded {
            Ok(record) => Ok((history_path, record)),
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&history_path) {
                    tracing::warn!(
                        path = %history_path.display(),
                        error = %remove_err,
                        "could not remove unindexed history file"
                    );
                }
                Err(e)
            }
        }
    }
}

/// Put `target` back the way it was before a failed export.
fn restore(target: &Path, previous: Option<&[u8]>) {
    let restored = match previous {
        Some(bytes) => atomic_replace(target, bytes),
        None => match fs::remove_file(target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InventoryError::io(target, e)),
        },
    };
    if let Err(e) = restored {
        tracing::warn!(path = %target.display(), error = %e, "rollback failed");
    }
}

fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn temp_file_with(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    fs::create_dir_all(dir).map_err(|e| InventoryError::io(dir, e))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| InventoryError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| InventoryError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| InventoryError::io(tmp.path(), e))?;
    Ok(tmp)
}

/// Replace `target` with `bytes` through a temp file and rename.
///
/// A destination held open by another program yields `SnapshotLocked`; the
/// previous file is left untouched either way.
pub fn atomic_replace(target: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_file_with(parent_dir(target), bytes)?;

    match tmp.persist(target) {
        Ok(_) => Ok(()),
        Err(PersistError { error, file }) => {
            drop(file);
            if platform::is_sharing_violation(&error) {
                tracing::warn!(path = %target.display(), "snapshot destination is locked");
                Err(InventoryError::SnapshotLocked {
                    path: target.to_path_buf(),
                })
            } else {
                Err(InventoryError::io(target, error))
            }
        }
    }
}

/// Write an immutable history file. Never overwrites: a name already taken
/// gets `_1`, `_2`, ... before the extension.
fn write_history(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let mut tmp = temp_file_with(dir, bytes)?;
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);

    for attempt in 0..MAX_NAME_COLLISIONS {
        let candidate = if attempt == 0 {
            dir.join(file_name)
        } else {
            dir.join(format!("{stem}_{attempt}.csv"))
        };

        match tmp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(PersistError { error, file }) if error.kind() == io::ErrorKind::AlreadyExists => {
                tmp = file;
            }
            Err(PersistError { error, .. }) => return Err(InventoryError::io(candidate, error)),
        }
    }

    Err(InventoryError::io(
        dir.join(file_name),
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "too many snapshots with the same timestamp",
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewProduct;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn writer(dir: &Path) -> SnapshotWriter {
        SnapshotWriter::new(
            dir.join("inventory.csv"),
            dir.join("last_inventory.csv"),
            dir.join("exports"),
        )
    }

    fn seeded() -> Store {
        let mut store = Store::open_in_memory().unwrap();
        store.create(NewProduct::new("A", "Alpha", Decimal::new(10, 0), 5)).unwrap();
        store.create(NewProduct::new("B", "Beta", Decimal::new(20, 0), 2)).unwrap();
        store
    }

    fn leftover_temp_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
            .count()
    }

    #[test]
    fn first_write_reports_first_export() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded();
        let products = store.list_by_id().unwrap();

        let handle = writer(dir.path()).write_snapshot(&mut store, &products).unwrap();

        assert_eq!(handle.quick_check, QuickCheck::FirstExport);
        assert_eq!(
            fs::read_to_string(&handle.current_path).unwrap(),
            "SKU,Name,Stock,Price\nA,Alpha,5,10\nB,Beta,2,20\n"
        );
        assert_eq!(
            fs::read(dir.path().join("last_inventory.csv")).unwrap(),
            fs::read(&handle.current_path).unwrap()
        );
        assert!(handle.history_path.starts_with(dir.path().join("exports")));
        assert_eq!(handle.record.row_count, 2);
        assert_eq!(store.list_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn unchanged_data_reports_no_changes() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded();
        let w = writer(dir.path());

        let products = store.list_by_id().unwrap();
        w.write_snapshot(&mut store, &products).unwrap();
        let second = w.write_snapshot(&mut store, &products).unwrap();

        assert_eq!(second.quick_check, QuickCheck::NoChanges);
    }

    #[test]
    fn stock_change_reports_changes_detected() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded();
        let w = writer(dir.path());

        let products = store.list_by_id().unwrap();
        w.write_snapshot(&mut store, &products).unwrap();
        crate::adjust::apply(&mut store, products[0].id, 1, "recount").unwrap();
        let products = store.list_by_id().unwrap();
        let second = w.write_snapshot(&mut store, &products).unwrap();

        assert_eq!(second.quick_check, QuickCheck::ChangesDetected);
    }

    #[test]
    fn same_timestamp_never_clobbers_history() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded();
        let w = writer(dir.path());
        let at = Utc::now();

        let products = store.list_by_id().unwrap();
        let a = w.write_snapshot_at(&mut store, &products, at).unwrap();
        let b = w.write_snapshot_at(&mut store, &products, at).unwrap();

        assert_ne!(a.history_path, b.history_path);
        assert!(b.record.file_name.ends_with("_1.csv"));
        assert_eq!(store.latest_snapshots(1).unwrap()[0].id, b.record.id);
    }

    #[test]
    fn failed_rename_keeps_target_and_cleans_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("inventory.csv");

        // a non-empty directory at the destination makes the rename fail
        fs::create_dir_all(target.join("blocker")).unwrap();

        let err = atomic_replace(&target, b"SKU,Name,Stock,Price\n").unwrap_err();

        assert!(matches!(err, InventoryError::Io { .. } | InventoryError::SnapshotLocked { .. }));
        assert_eq!(leftover_temp_files(dir.path()), 0);
        assert!(target.join("blocker").is_dir());
    }

    #[test]
    fn failed_history_write_rolls_back_current_and_reference() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded();
        let w = writer(dir.path());

        let products = store.list_by_id().unwrap();
        w.write_snapshot(&mut store, &products).unwrap();
        let current_before = fs::read(w.current_path()).unwrap();
        let reference_before = fs::read(dir.path().join("last_inventory.csv")).unwrap();

        // a plain file where the history directory should be
        fs::remove_dir_all(w.history_dir()).unwrap();
        fs::write(w.history_dir(), b"not a directory").unwrap();

        store.create(NewProduct::new("C", "Cups", Decimal::new(30, 0), 1)).unwrap();
        let products = store.list_by_id().unwrap();
        assert!(w.write_snapshot(&mut store, &products).is_err());

        assert_eq!(fs::read(w.current_path()).unwrap(), current_before);
        assert_eq!(fs::read(dir.path().join("last_inventory.csv")).unwrap(), reference_before);
        assert_eq!(leftover_temp_files(dir.path()), 0);
        assert_eq!(store.list_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn blocked_reference_leaves_prior_export_intact() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::open_in_memory().unwrap();
        store.create(NewProduct::new("A", "Alpha", Decimal::new(10, 0), 5)).unwrap();
        let w = writer(dir.path());

        let products = store.list_by_id().unwrap();
        w.write_snapshot(&mut store, &products).unwrap();

        let reference = dir.path().join("last_inventory.csv");
        fs::remove_file(&reference).unwrap();
        fs::create_dir_all(reference.join("blocker")).unwrap();

        store.create(NewProduct::new("B", "Beta", Decimal::new(20, 0), 2)).unwrap();
        let products = store.list_by_id().unwrap();
        assert!(w.write_snapshot(&mut store, &products).is_err());

        assert_eq!(
            fs::read_to_string(w.current_path()).unwrap(),
            "SKU,Name,Stock,Price\nA,Alpha,5,10\n"
        );
        assert_eq!(leftover_temp_files(dir.path()), 0);
        assert_eq!(store.list_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn first_export_failure_leaves_no_current_file() {
        let dir = TempDir::new().unwrap();
        let mut store = seeded();
        let w = writer(dir.path());
        fs::write(w.history_dir(), b"not a directory").unwrap();

        let products = store.list_by_id().unwrap();
        assert!(w.write_snapshot(&mut store, &products).is_err());

        assert!(!w.current_path().exists());
        assert!(!dir.path().join("last_inventory.csv").exists());
        assert!(store.list_snapshots().unwrap().is_empty());
    }

    #[test]
    fn atomic_replace_creates_missing_parent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("out.csv");
        atomic_replace(&target, b"hello").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"hello");
        assert_eq!(leftover_temp_files(&dir.path().join("nested")), 0);
    }
}

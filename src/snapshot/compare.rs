//! Snapshot comparison.
//!
//! Two modes:
//! - quick check: byte equality of the current export against the reference copy
//! - row diff: the two most recent history snapshots, aligned by row position
//!
//! Rows are paired by index, not by SKU. Inserting or deleting a product in
//! the middle of the list shifts every later pair, so unrelated rows show up
//! as CHANGED, NEW or REMOVED.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use super::{csv_format, SnapshotRow};
use crate::error::{InventoryError, Result};
use crate::store::snapshot_index::SnapshotRecord;
use crate::store::Store;

pub const COMPARISON_FILE_NAME: &str = "compare_inventory.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuickCheck {
    NoChanges,
    ChangesDetected,
    FirstExport,
}

impl fmt::Display for QuickCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            QuickCheck::NoChanges => "No changes since last export.",
            QuickCheck::ChangesDetected => "Changes detected since last export.",
            QuickCheck::FirstExport => "First export created.",
        };
        f.write_str(text)
    }
}

impl QuickCheck {
    /// Classify freshly rendered bytes against the previous reference copy.
    pub fn between(latest: &[u8], previous: Option<&[u8]>) -> QuickCheck {
        match previous {
            None => QuickCheck::FirstExport,
            Some(previous) if previous == latest => QuickCheck::NoChanges,
            Some(_) => QuickCheck::ChangesDetected,
        }
    }
}

/// Read a file that may legitimately be absent.
pub(crate) fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(InventoryError::io(path, e)),
    }
}

/// Byte-for-byte comparison of `current` against `reference`.
/// A missing reference is the normal first-run state.
pub fn quick_compare(current: &Path, reference: &Path) -> Result<QuickCheck> {
    let Some(previous) = read_if_exists(reference)? else {
        return Ok(QuickCheck::FirstExport);
    };
    let latest = fs::read(current).map_err(|e| InventoryError::io(current, e))?;
    Ok(QuickCheck::between(&latest, Some(&previous)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    New,
    Removed,
    Unchanged,
    /// Stock or price differ.
    Changed,
    /// Only SKU or name differ.
    Updated,
    /// Both sides are placeholders.
    Blank,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::New => "NEW",
            RowStatus::Removed => "REMOVED",
            RowStatus::Unchanged => "UNCHANGED",
            RowStatus::Changed => "CHANGED",
            RowStatus::Updated => "UPDATED",
            RowStatus::Blank => "",
        }
    }

    pub fn classify(previous: &SnapshotRow, current: &SnapshotRow) -> Self {
        match (previous.is_empty(), current.is_empty()) {
            (true, true) => RowStatus::Blank,
            (true, false) => RowStatus::New,
            (false, true) => RowStatus::Removed,
            (false, false) if previous == current => RowStatus::Unchanged,
            (false, false)
                if previous.stock != current.stock || previous.price != current.price =>
            {
                RowStatus::Changed
            }
            (false, false) => RowStatus::Updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub index: usize,
    pub previous: SnapshotRow,
    pub current: SnapshotRow,
    pub status: RowStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub new: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Comparison {
    pub previous: Option<SnapshotRecord>,
    pub current: Option<SnapshotRecord>,
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for row in &self.rows {
            match row.status {
                RowStatus::New => counts.new += 1,
                RowStatus::Removed => counts.removed += 1,
                RowStatus::Unchanged => counts.unchanged += 1,
                RowStatus::Changed => counts.changed += 1,
                RowStatus::Updated => counts.updated += 1,
                RowStatus::Blank => {}
            }
        }
        counts
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        csv_format::render_comparison(
            self.rows
                .iter()
                .map(|r| (&r.previous, &r.current, r.status.as_str())),
        )
    }
}

/// Pair rows by position over `max(len(previous), len(current))`.
pub fn diff_snapshots(previous: &[SnapshotRow], current: &[SnapshotRow]) -> Vec<ComparisonRow> {
    let len = previous.len().max(current.len());
    (0..len)
        .map(|index| {
            let prev = previous.get(index).cloned().unwrap_or_default();
            let curr = current.get(index).cloned().unwrap_or_default();
            let status = RowStatus::classify(&prev, &curr);
            ComparisonRow {
                index,
                previous: prev,
                current: curr,
                status,
            }
        })
        .collect()
}

fn load_rows(record: &SnapshotRecord, history_dir: &Path) -> Result<Vec<SnapshotRow>> {
    let path = record.path_in(history_dir);
    let bytes = fs::read(&path).map_err(|e| InventoryError::io(&path, e))?;
    csv_format::parse_snapshot(&bytes, &path)
}

/// Row diff of the two most recent indexed snapshots.
///
/// With one snapshot every row is NEW; with none the result is empty.
pub fn diff(store: &Store, history_dir: &Path) -> Result<Comparison> {
    let mut latest = store.latest_snapshots(2)?.into_iter();
    let Some(current) = latest.next() else {
        tracing::debug!("no snapshots to compare");
        return Ok(Comparison::default());
    };
    let previous = latest.next();

    let current_rows = load_rows(&current, history_dir)?;
    let previous_rows = match &previous {
        Some(record) => load_rows(record, history_dir)?,
        None => Vec::new(),
    };

    let rows = diff_snapshots(&previous_rows, &current_rows);
    tracing::info!(
        current = %current.file_name,
        previous = previous.as_ref().map(|p| p.file_name.as_str()).unwrap_or("-"),
        rows = rows.len(),
        "compared snapshots"
    );

    Ok(Comparison {
        previous,
        current: Some(current),
        rows,
    })
}

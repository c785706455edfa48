//! CSV inventory snapshots.
//!
//! A snapshot is the full product list serialized as `SKU,Name,Stock,Price`.
//! The writer replaces the current export atomically, keeps a reference copy
//! for the quick byte-level check, and files every export under a
//! timestamped name in the history directory.

pub mod compare;
pub mod csv_format;
pub mod writer;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::model::Product;

pub const HISTORY_PREFIX: &str = "inventory_";
const HISTORY_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// One snapshot line. Fields are kept as text so a comparison sees exactly
/// what the file holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotRow {
    pub sku: String,
    pub name: String,
    pub stock: String,
    pub price: String,
}

impl SnapshotRow {
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        stock: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        SnapshotRow {
            sku: sku.into(),
            name: name.into(),
            stock: stock.into(),
            price: price.into(),
        }
    }

    /// Placeholder rows (missing or short lines) have every field empty.
    pub fn is_empty(&self) -> bool {
        self.sku.is_empty()
            && self.name.is_empty()
            && self.stock.is_empty()
            && self.price.is_empty()
    }

    pub fn fields(&self) -> [&str; 4] {
        [&self.sku, &self.name, &self.stock, &self.price]
    }
}

impl From<&Product> for SnapshotRow {
    fn from(p: &Product) -> Self {
        SnapshotRow::new(p.sku.clone(), p.name.clone(), p.stock.to_string(), p.price.to_string())
    }
}

/// `inventory_<YYYYMMDDTHHMMSS>_<micros>.csv`; sorts lexicographically in
/// chronological order.
pub fn history_file_name(at: DateTime<Utc>) -> String {
    format!("{HISTORY_PREFIX}{}_{}.csv", at.format(HISTORY_TIME_FORMAT), at.format("%6f"))
}

/// Recover the microsecond timestamp from a history file name.
pub fn timestamp_from_file_name(name: &str) -> Option<i64> {
    let stem = name.strip_prefix(HISTORY_PREFIX)?.strip_suffix(".csv")?;
    let datetime = stem.get(..15)?;
    let rest = stem.get(15..)?;
    let micros: i64 = rest.strip_prefix('_')?.get(..6)?.parse().ok()?;
    let parsed = NaiveDateTime::parse_from_str(datetime, HISTORY_TIME_FORMAT).ok()?;
    Some(parsed.and_utc().timestamp_micros() + micros)
}

//! Error taxonomy for inventory operations.
//!
//! Constraint violations and locked snapshot files are expected conditions:
//! they carry a `hint()` the caller can show next to the message.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::ProductId;

pub type Result<T> = std::result::Result<T, InventoryError>;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("SKU '{sku}' is already used by another product")]
    DuplicateSku { sku: String },

    #[error("product {id} not found")]
    NotFound { id: ProductId },

    #[error("cannot replace {}: the file is held open by another program", path.display())]
    SnapshotLocked { path: PathBuf },

    #[error("snapshot {} is malformed: {reason}", path.display())]
    MalformedSnapshot { path: PathBuf, reason: String },

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl InventoryError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        InventoryError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        InventoryError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Advice for the user when the failure is recoverable by retrying.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            InventoryError::DuplicateSku { .. } => {
                Some("SKU must be unique. Choose a different SKU and try again.")
            }
            InventoryError::SnapshotLocked { .. } => Some(
                "The file might be open in a spreadsheet or another program. \
                 Close it and try again.",
            ),
            InventoryError::NotFound { .. } => {
                Some("Run 'stocktake list' to see valid product ids.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_sku_message_names_the_sku() {
        let err = InventoryError::DuplicateSku { sku: "DBR-001".into() };
        assert_eq!(err.to_string(), "SKU 'DBR-001' is already used by another product");
        assert!(err.hint().is_some());
    }

    #[test]
    fn locked_snapshot_has_retry_hint() {
        let err = InventoryError::SnapshotLocked { path: PathBuf::from("inventory.csv") };
        assert!(err.to_string().contains("inventory.csv"));
        assert!(err.hint().unwrap().contains("try again"));
    }

    #[test]
    fn io_errors_carry_no_hint() {
        let err = InventoryError::io("x.csv", std::io::Error::other("boom"));
        assert!(err.hint().is_none());
        assert!(err.to_string().starts_with("x.csv"));
    }
}

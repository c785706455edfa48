pub mod adjust;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod platform;
pub mod report;
pub mod snapshot;
pub mod store;

pub use error::{InventoryError, Result};

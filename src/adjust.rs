//! Stock adjustments.
//!
//! Applies a signed delta to a product's stock level. Decreases larger than
//! the available stock are clamped to zero rather than rejected. The free-text
//! reason is kept on the product and written to the log.

use rusqlite::params;
use serde::Serialize;

use crate::error::Result;
use crate::model::ProductId;
use crate::store::product::fetch;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Adjustment {
    pub product_id: ProductId,
    pub sku: String,
    pub before: u32,
    pub after: u32,
    /// Delta the caller asked for.
    pub requested: i64,
    /// Delta actually applied after clamping.
    pub applied: i64,
    pub reason: String,
}

impl Adjustment {
    pub fn was_clamped(&self) -> bool {
        self.requested != self.applied
    }
}

/// `max(0, stock + delta)`, saturating at `u32::MAX` on the high side.
pub fn clamp_stock(stock: u32, delta: i64) -> u32 {
    let target = i64::from(stock).saturating_add(delta);
    u32::try_from(target.max(0)).unwrap_or(u32::MAX)
}

/// Adjust a product's stock by `delta` and record `reason`.
pub fn apply(store: &mut Store, id: ProductId, delta: i64, reason: &str) -> Result<Adjustment> {
    let reason = reason.trim().to_string();
    let tx = store.conn_mut().transaction()?;
    let product = fetch(&tx, id)?;

    let after = clamp_stock(product.stock, delta);

    tx.execute(
        "UPDATE products SET stock = ?1, last_adjustment = ?2 WHERE id = ?3",
        params![after, reason, id.0],
    )?;
    tx.commit()?;

    let adjustment = Adjustment {
        product_id: id,
        sku: product.sku,
        before: product.stock,
        after,
        requested: delta,
        applied: i64::from(after) - i64::from(product.stock),
        reason,
    };

    if adjustment.was_clamped() {
        tracing::warn!(
            id = %id,
            sku = %adjustment.sku,
            requested = delta,
            applied = adjustment.applied,
            "stock adjustment clamped"
        );
    }
    tracing::info!(
        id = %id,
        sku = %adjustment.sku,
        before = adjustment.before,
        after = adjustment.after,
        reason = %adjustment.reason,
        "stock adjusted"
    );

    Ok(adjustment)
}

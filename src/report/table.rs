//! Plain-text tables for the terminal.

use chrono::DateTime;

use super::format_money;
use crate::adjust::Adjustment;
use crate::model::{InventorySummary, Product};
use crate::snapshot::compare::Comparison;
use crate::store::snapshot_index::SnapshotRecord;

pub fn products(products: &[Product]) -> String {
    if products.is_empty() {
        return String::from("No products.\n");
    }

    let mut output = format!(
        "{:<5} {:<12} {:<28} {:>8} {:>12} {:>9}\n",
        "ID", "SKU", "Name", "Stock", "Price", "Threshold"
    );
    output.push_str(&"-".repeat(79));
    output.push('\n');

    for p in products {
        let marker = if p.is_low_stock() { " !" } else { "" };
        output.push_str(&format!(
            "{:<5} {:<12} {:<28} {:>8} {:>12} {:>9}{marker}\n",
            p.id.0,
            truncate(&p.sku, 12),
            truncate(&p.name, 28),
            p.stock,
            format_money(p.price),
            p.reorder_threshold,
        ));
    }

    output
}

pub fn low_stock(items: &[Product]) -> String {
    if items.is_empty() {
        return String::from("No low-stock items.\n");
    }

    let mut output = format!(
        "{:<5} {:<12} {:<28} {:>8} {:>9}\n",
        "ID", "SKU", "Name", "Stock", "Threshold"
    );
    output.push_str(&"-".repeat(66));
    output.push('\n');
    for p in items {
        output.push_str(&format!(
            "{:<5} {:<12} {:<28} {:>8} {:>9}\n",
            p.id.0,
            truncate(&p.sku, 12),
            truncate(&p.name, 28),
            p.stock,
            p.reorder_threshold,
        ));
    }
    output
}

pub fn product_detail(p: &Product) -> String {
    let mut output = String::new();
    output.push_str(&format!("id:          {}\n", p.id));
    output.push_str(&format!("sku:         {}\n", p.sku));
    output.push_str(&format!("name:        {}\n", p.name));
    output.push_str(&format!("description: {}\n", p.description.as_deref().unwrap_or("")));
    output.push_str(&format!("price:       {}\n", format_money(p.price)));
    output.push_str(&format!("stock:       {}\n", p.stock));
    output.push_str(&format!("threshold:   {}\n", p.reorder_threshold));
    if let Some(reason) = &p.last_adjustment {
        output.push_str(&format!("last adjust: {reason}\n"));
    }
    output
}

pub fn summary(s: &InventorySummary) -> String {
    format!(
        concat!(
            "Total product types: {}\n",
            "Total items:         {}\n",
            "Inventory value:     {}\n",
            "Low-stock items:     {}\n",
        ),
        s.product_count,
        s.total_units,
        format_money(s.total_value),
        s.low_stock_count
    )
}

pub fn adjustment(a: &Adjustment) -> String {
    let mut line = format!("{}: stock {} -> {} ({:+})", a.sku, a.before, a.after, a.applied);
    if a.was_clamped() {
        line.push_str(&format!(" [requested {:+}, clamped at zero]", a.requested));
    }
    if !a.reason.is_empty() {
        line.push_str(&format!(" reason: {}", a.reason));
    }
    line.push('\n');
    line
}

pub fn snapshots(records: &[SnapshotRecord]) -> String {
    if records.is_empty() {
        return String::from("No snapshots found. Run 'stocktake export' to create one.\n");
    }

    let mut output = format!("{:<6} {:<28} {:<40} {:>6}\n", "ID", "Date", "File", "Rows");
    output.push_str(&"-".repeat(83));
    output.push('\n');
    for r in records {
        output.push_str(&format!(
            "{:<6} {:<28} {:<40} {:>6}\n",
            r.id,
            format_micros(r.created_at_micros),
            truncate(&r.file_name, 40),
            r.row_count
        ));
    }
    output
}

pub fn comparison(c: &Comparison) -> String {
    let Some(current) = &c.current else {
        return String::from("No snapshots to compare. Run 'stocktake export' first.\n");
    };

    let mut output = String::new();
    match &c.previous {
        Some(previous) => output.push_str(&format!(
            "Comparing snapshots:\n  From: {} ({})\n  To:   {} ({})\n",
            previous.file_name,
            format_micros(previous.created_at_micros),
            current.file_name,
            format_micros(current.created_at_micros)
        )),
        None => output.push_str(&format!(
            "Only one snapshot ({}); every row is new.\n",
            current.file_name
        )),
    }

    let counts = c.counts();
    output.push_str(&format!(
        "  unchanged: {}  changed: {}  updated: {}  new: {}  removed: {}\n",
        counts.unchanged, counts.changed, counts.updated, counts.new, counts.removed
    ));
    output
}

fn format_micros(micros: i64) -> String {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

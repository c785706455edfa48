use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use super::{is_constraint_violation, Store};
use crate::error::{InventoryError, Result};
use crate::model::{InventorySummary, NewProduct, Product, ProductId, ProductUpdate};

const PRODUCT_COLUMNS: &str =
    "id, sku, name, description, price, stock, reorder_threshold, last_adjustment";

impl Store {
    /// Insert a product. Fails with `DuplicateSku` if the SKU is taken.
    pub fn create(&mut self, product: NewProduct) -> Result<Product> {
        let product = product.normalized()?;
        let tx = self.conn_mut().transaction()?;

        let inserted = tx.execute(
            "INSERT INTO products (sku, name, description, price, stock, reorder_threshold)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                product.sku,
                product.name,
                product.description,
                product.price.to_string(),
                product.stock,
                product.reorder_threshold
            ],
        );

        if let Err(e) = inserted {
            return Err(map_sku_conflict(e, &product.sku));
        }

        let id = ProductId(tx.last_insert_rowid());
        let created = fetch(&tx, id)?;
        tx.commit()?;

        tracing::info!(id = %created.id, sku = %created.sku, "product created");
        Ok(created)
    }

    pub fn get(&self, id: ProductId) -> Result<Product> {
        fetch(self.conn(), id)
    }

    /// All products ordered by name, ties by id.
    pub fn list(&self) -> Result<Vec<Product>> {
        query_products(self.conn(), "ORDER BY name ASC, id ASC")
    }

    /// All products in store iteration (insertion) order.
    pub fn list_by_id(&self) -> Result<Vec<Product>> {
        query_products(self.conn(), "ORDER BY id ASC")
    }

    /// Products at or below their reorder threshold, lowest stock first.
    /// Ties are broken by SKU.
    pub fn low_stock(&self) -> Result<Vec<Product>> {
        query_products(
            self.conn(),
            "WHERE stock <= reorder_threshold ORDER BY stock ASC, sku ASC",
        )
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn summary(&self) -> Result<InventorySummary> {
        Ok(InventorySummary::from_products(&self.list_by_id()?))
    }

    /// Apply a partial edit. Fails with `DuplicateSku` when the new SKU
    /// belongs to another product, `NotFound` when `id` does not exist.
    pub fn update(&mut self, id: ProductId, update: &ProductUpdate) -> Result<Product> {
        let tx = self.conn_mut().transaction()?;
        let current = fetch(&tx, id)?;
        let next = update.apply_to(&current)?;

        let written = tx.execute(
            "UPDATE products
             SET sku = ?1, name = ?2, description = ?3, price = ?4, stock = ?5,
                 reorder_threshold = ?6
             WHERE id = ?7",
            params![
                next.sku,
                next.name,
                next.description,
                next.price.to_string(),
                next.stock,
                next.reorder_threshold,
                id.0
            ],
        );

        if let Err(e) = written {
            return Err(map_sku_conflict(e, &next.sku));
        }

        tx.commit()?;
        tracing::info!(id = %id, sku = %next.sku, "product updated");
        Ok(next)
    }

    /// Remove a product, returning the deleted record.
    pub fn delete(&mut self, id: ProductId) -> Result<Product> {
        let tx = self.conn_mut().transaction()?;
        let existing = fetch(&tx, id)?;
        tx.execute("DELETE FROM products WHERE id = ?1", params![id.0])?;
        tx.commit()?;

        tracing::info!(id = %id, sku = %existing.sku, "product deleted");
        Ok(existing)
    }

    /// Insert the starter catalogue when the store is empty.
    /// Returns how many products were added.
    pub fn seed_samples(&mut self) -> Result<usize> {
        if self.count()? > 0 {
            return Ok(0);
        }

        let samples = [
            NewProduct::new("DBR-001", "Espresso Beans 250g", Decimal::new(25000, 2), 20)
                .with_description("Dark roast")
                .with_reorder_threshold(5),
            NewProduct::new("DBR-002", "Milk (1L)", Decimal::new(8000, 2), 10)
                .with_description("Fresh milk")
                .with_reorder_threshold(3),
            NewProduct::new("DBR-003", "Cup (12oz)", Decimal::new(250, 2), 200)
                .with_description("Disposable cup")
                .with_reorder_threshold(50),
        ];

        let count = samples.len();
        for sample in samples {
            self.create(sample)?;
        }
        Ok(count)
    }
}

/// Load one product through any connection or open transaction.
pub(crate) fn fetch(conn: &Connection, id: ProductId) -> Result<Product> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    conn.query_row(&sql, params![id.0], product_from_row)
        .optional()?
        .ok_or(InventoryError::NotFound { id })
}

fn query_products(conn: &Connection, clause: &str) -> Result<Vec<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products {clause}");
    let mut stmt = conn.prepare(&sql)?;
    let products = stmt
        .query_map([], product_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(products)
}

fn product_from_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    let price_text: String = row.get(4)?;
    let price = Decimal::from_str(&price_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(Product {
        id: ProductId(row.get(0)?),
        sku: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        price,
        stock: row.get(5)?,
        reorder_threshold: row.get(6)?,
        last_adjustment: row.get(7)?,
    })
}

fn map_sku_conflict(err: rusqlite::Error, sku: &str) -> InventoryError {
    if is_constraint_violation(&err) && err.to_string().contains("products.sku") {
        tracing::warn!(sku, "rejected duplicate sku");
        InventoryError::DuplicateSku { sku: sku.to_string() }
    } else {
        InventoryError::Database(err)
    }
}

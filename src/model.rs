use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

pub const DEFAULT_REORDER_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    pub reorder_threshold: u32,
    /// Reason given for the most recent stock adjustment.
    pub last_adjustment: Option<String>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.reorder_threshold
    }

    pub fn stock_value(&self) -> Decimal {
        self.price * Decimal::from(self.stock)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    pub reorder_threshold: u32,
}

impl NewProduct {
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        stock: u32,
    ) -> Self {
        NewProduct {
            sku: sku.into(),
            name: name.into(),
            description: None,
            price,
            stock,
            reorder_threshold: DEFAULT_REORDER_THRESHOLD,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reorder_threshold(mut self, threshold: u32) -> Self {
        self.reorder_threshold = threshold;
        self
    }

    /// Trims text fields and checks the field constraints.
    pub fn normalized(self) -> Result<Self> {
        Ok(NewProduct {
            sku: required("sku", &self.sku)?,
            name: required("name", &self.name)?,
            description: optional(self.description.as_deref()),
            price: non_negative_price(self.price)?,
            stock: self.stock,
            reorder_threshold: self.reorder_threshold,
        })
    }
}

/// Partial edit of a product. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub reorder_threshold: Option<u32>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProductUpdate::default()
    }

    /// Applies the edit on top of `product`, validating every changed field.
    pub fn apply_to(&self, product: &Product) -> Result<Product> {
        let mut updated = product.clone();
        if let Some(sku) = &self.sku {
            updated.sku = required("sku", sku)?;
        }
        if let Some(name) = &self.name {
            updated.name = required("name", name)?;
        }
        if let Some(description) = &self.description {
            updated.description = optional(description.as_deref());
        }
        if let Some(price) = self.price {
            updated.price = non_negative_price(price)?;
        }
        if let Some(stock) = self.stock {
            updated.stock = stock;
        }
        if let Some(threshold) = self.reorder_threshold {
            updated.reorder_threshold = threshold;
        }
        Ok(updated)
    }
}

/// Dashboard totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub product_count: usize,
    pub total_units: u64,
    pub total_value: Decimal,
    pub low_stock_count: usize,
}

impl InventorySummary {
    pub fn from_products(products: &[Product]) -> Self {
        InventorySummary {
            product_count: products.len(),
            total_units: products.iter().map(|p| u64::from(p.stock)).sum(),
            total_value: products.iter().map(Product::stock_value).sum(),
            low_stock_count: products.iter().filter(|p| p.is_low_stock()).count(),
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::invalid(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn non_negative_price(price: Decimal) -> Result<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(InventoryError::invalid("price", format!("{price} is negative")));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(stock: u32, threshold: u32) -> Product {
        Product {
            id: ProductId(1),
            sku: "A".into(),
            name: "Alpha".into(),
            description: None,
            price: Decimal::new(250, 2),
            stock,
            reorder_threshold: threshold,
            last_adjustment: None,
        }
    }

    #[test]
    fn normalized_trims_and_drops_blank_description() {
        let input =
            NewProduct::new("  DBR-001 ", " Beans ", Decimal::ONE, 3).with_description("   ");
        let p = input.normalized().unwrap();
        assert_eq!(p.sku, "DBR-001");
        assert_eq!(p.name, "Beans");
        assert_eq!(p.description, None);
        assert_eq!(p.reorder_threshold, DEFAULT_REORDER_THRESHOLD);
    }

    #[test]
    fn empty_name_rejected() {
        let err = NewProduct::new("A", "  ", Decimal::ONE, 0).normalized().unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput { field: "name", .. }));
    }

    #[test]
    fn negative_price_rejected() {
        let err = NewProduct::new("A", "Alpha", Decimal::new(-1, 0), 0).normalized().unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput { field: "price", .. }));
    }

    #[test]
    fn update_only_touches_given_fields() {
        let before = product(10, 5);
        let update = ProductUpdate {
            name: Some("Beta".into()),
            description: Some(Some("fresh".into())),
            ..Default::default()
        };
        let after = update.apply_to(&before).unwrap();
        assert_eq!(after.name, "Beta");
        assert_eq!(after.description.as_deref(), Some("fresh"));
        assert_eq!(after.sku, before.sku);
        assert_eq!(after.stock, before.stock);
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        assert!(product(5, 5).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
    }

    #[test]
    fn summary_totals() {
        let products = vec![product(2, 5), product(10, 5)];
        let summary = InventorySummary::from_products(&products);
        assert_eq!(summary.product_count, 2);
        assert_eq!(summary.total_units, 12);
        assert_eq!(summary.total_value, Decimal::new(3000, 2));
        assert_eq!(summary.low_stock_count, 1);
    }
}

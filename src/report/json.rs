//! JSON output for scripting and piping.

use serde::Serialize;

/// Pretty JSON; serialization of these plain records cannot fail in practice,
/// but an error is still reported as a JSON string rather than a panic.
pub fn render<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Product, ProductId};
    use rust_decimal::Decimal;

    #[test]
    fn product_serializes_price_exactly() {
        let product = Product {
            id: ProductId(3),
            sku: "DBR-003".into(),
            name: "Cup (12oz)".into(),
            description: None,
            price: Decimal::new(250, 2),
            stock: 200,
            reorder_threshold: 50,
            last_adjustment: None,
        };
        let value: serde_json::Value = serde_json::from_str(&render(&product)).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["price"], "2.50");
        assert_eq!(value["stock"], 200);
    }
}

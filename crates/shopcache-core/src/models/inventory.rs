use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sellable product. Catalog attributes are stored as ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// A purchased lot of one product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockBatch {
    #[serde(rename = "_id")]
    pub id: String,
    pub product: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    /// Units not yet allocated to any shop
    #[serde(default)]
    pub remaining: u32,
    #[serde(default)]
    pub purchase_price: Option<f64>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

impl StockBatch {
    pub fn allocated(&self) -> u32 {
        self.quantity.saturating_sub(self.remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_batch_allocated() {
        let batch = StockBatch {
            quantity: 10,
            remaining: 4,
            ..Default::default()
        };
        assert_eq!(batch.allocated(), 6);

        // Bad data from the server should not underflow
        let odd = StockBatch {
            quantity: 2,
            remaining: 5,
            ..Default::default()
        };
        assert_eq!(odd.allocated(), 0);
    }

    #[test]
    fn test_product_minimal_json() {
        let product: Product = serde_json::from_str(r#"{"_id":"p1","name":"Pixel 8"}"#).unwrap();
        assert_eq!(product.name, "Pixel 8");
        assert!(product.price.is_none());
    }
}

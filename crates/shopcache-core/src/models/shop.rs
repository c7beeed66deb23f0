use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Stock allocated from a batch to a single shop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStock {
    #[serde(rename = "_id")]
    pub id: String,
    pub shop: String,
    pub product: String,
    #[serde(default)]
    pub stock_batch: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub selling_price: Option<f64>,
}

impl SubStock {
    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }
}

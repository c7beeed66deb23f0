use serde::{Deserialize, Serialize};

/// Headline totals shown on the dashboard landing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_products: u64,
    pub total_stock: u64,
    pub total_shops: u64,
    pub total_customers: u64,
    pub total_sales: u64,
    pub sales_amount: f64,
    pub purchase_amount: f64,
    pub low_stock_count: u64,
}

//! Resource identities and the typed collections stored under them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{
    Brand, Category, Color, Condition, Customer, DashboardStats, Product, Shop, Source, StockBatch,
    SubStock, Variant,
};

/// One cached collection. Doubles as the id of the preload step that loads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ResourceKey {
    Categories,
    Brands,
    Variants,
    Colors,
    Conditions,
    Sources,
    Shops,
    Products,
    StockBatches,
    Customers,
    SubStocks,
    DashboardStats,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 12] = [
        ResourceKey::Categories,
        ResourceKey::Brands,
        ResourceKey::Variants,
        ResourceKey::Colors,
        ResourceKey::Conditions,
        ResourceKey::Sources,
        ResourceKey::Shops,
        ResourceKey::Products,
        ResourceKey::StockBatches,
        ResourceKey::Customers,
        ResourceKey::SubStocks,
        ResourceKey::DashboardStats,
    ];

    /// Reference data every role loads, fetched concurrently.
    pub const SHARED: [ResourceKey; 6] = [
        ResourceKey::Categories,
        ResourceKey::Brands,
        ResourceKey::Variants,
        ResourceKey::Colors,
        ResourceKey::Conditions,
        ResourceKey::Sources,
    ];

    pub fn is_shared(self) -> bool {
        Self::SHARED.contains(&self)
    }

    /// Checklist label shown while preloading
    pub fn label(self) -> &'static str {
        match self {
            ResourceKey::Categories => "Categories",
            ResourceKey::Brands => "Brands",
            ResourceKey::Variants => "Variants",
            ResourceKey::Colors => "Colors",
            ResourceKey::Conditions => "Conditions",
            ResourceKey::Sources => "Sources",
            ResourceKey::Shops => "Shops",
            ResourceKey::Products => "Products",
            ResourceKey::StockBatches => "Stock Batches",
            ResourceKey::Customers => "Customers",
            ResourceKey::SubStocks => "Shop Stock",
            ResourceKey::DashboardStats => "Dashboard Stats",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKey::Categories => "categories",
            ResourceKey::Brands => "brands",
            ResourceKey::Variants => "variants",
            ResourceKey::Colors => "colors",
            ResourceKey::Conditions => "conditions",
            ResourceKey::Sources => "sources",
            ResourceKey::Shops => "shops",
            ResourceKey::Products => "products",
            ResourceKey::StockBatches => "stockBatches",
            ResourceKey::Customers => "customers",
            ResourceKey::SubStocks => "subStocks",
            ResourceKey::DashboardStats => "dashboardStats",
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKey {
    type Err = String;

    /// Accepts the camelCase key as well as kebab/snake spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        ResourceKey::ALL
            .into_iter()
            .find(|key| key.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| format!("Unknown resource: {}", s))
    }
}

/// A fetched collection, tagged by resource.
///
/// Payloads sit behind `Arc` so a cache read hands out the current value
/// without copying, and a replacement is a pointer swap.
#[derive(Debug, Clone)]
pub enum Dataset {
    Categories(Arc<Vec<Category>>),
    Brands(Arc<Vec<Brand>>),
    Variants(Arc<Vec<Variant>>),
    Colors(Arc<Vec<Color>>),
    Conditions(Arc<Vec<Condition>>),
    Sources(Arc<Vec<Source>>),
    Shops(Arc<Vec<Shop>>),
    Products(Arc<Vec<Product>>),
    StockBatches(Arc<Vec<StockBatch>>),
    Customers(Arc<Vec<Customer>>),
    SubStocks(Arc<Vec<SubStock>>),
    DashboardStats(Arc<DashboardStats>),
}

impl Dataset {
    /// Empty value for a resource
    pub fn empty(key: ResourceKey) -> Self {
        match key {
            ResourceKey::Categories => Dataset::Categories(Arc::default()),
            ResourceKey::Brands => Dataset::Brands(Arc::default()),
            ResourceKey::Variants => Dataset::Variants(Arc::default()),
            ResourceKey::Colors => Dataset::Colors(Arc::default()),
            ResourceKey::Conditions => Dataset::Conditions(Arc::default()),
            ResourceKey::Sources => Dataset::Sources(Arc::default()),
            ResourceKey::Shops => Dataset::Shops(Arc::default()),
            ResourceKey::Products => Dataset::Products(Arc::default()),
            ResourceKey::StockBatches => Dataset::StockBatches(Arc::default()),
            ResourceKey::Customers => Dataset::Customers(Arc::default()),
            ResourceKey::SubStocks => Dataset::SubStocks(Arc::default()),
            ResourceKey::DashboardStats => Dataset::DashboardStats(Arc::default()),
        }
    }

    pub fn key(&self) -> ResourceKey {
        match self {
            Dataset::Categories(_) => ResourceKey::Categories,
            Dataset::Brands(_) => ResourceKey::Brands,
            Dataset::Variants(_) => ResourceKey::Variants,
            Dataset::Colors(_) => ResourceKey::Colors,
            Dataset::Conditions(_) => ResourceKey::Conditions,
            Dataset::Sources(_) => ResourceKey::Sources,
            Dataset::Shops(_) => ResourceKey::Shops,
            Dataset::Products(_) => ResourceKey::Products,
            Dataset::StockBatches(_) => ResourceKey::StockBatches,
            Dataset::Customers(_) => ResourceKey::Customers,
            Dataset::SubStocks(_) => ResourceKey::SubStocks,
            Dataset::DashboardStats(_) => ResourceKey::DashboardStats,
        }
    }

    /// Number of records (stats count as one)
    pub fn len(&self) -> usize {
        match self {
            Dataset::Categories(v) => v.len(),
            Dataset::Brands(v) => v.len(),
            Dataset::Variants(v) => v.len(),
            Dataset::Colors(v) => v.len(),
            Dataset::Conditions(v) => v.len(),
            Dataset::Sources(v) => v.len(),
            Dataset::Shops(v) => v.len(),
            Dataset::Products(v) => v.len(),
            Dataset::StockBatches(v) => v.len(),
            Dataset::Customers(v) => v.len(),
            Dataset::SubStocks(v) => v.len(),
            Dataset::DashboardStats(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both values are the same allocation, i.e. nothing replaced it.
    pub fn same_as(&self, other: &Dataset) -> bool {
        match (self, other) {
            (Dataset::Categories(a), Dataset::Categories(b)) => Arc::ptr_eq(a, b),
            (Dataset::Brands(a), Dataset::Brands(b)) => Arc::ptr_eq(a, b),
            (Dataset::Variants(a), Dataset::Variants(b)) => Arc::ptr_eq(a, b),
            (Dataset::Colors(a), Dataset::Colors(b)) => Arc::ptr_eq(a, b),
            (Dataset::Conditions(a), Dataset::Conditions(b)) => Arc::ptr_eq(a, b),
            (Dataset::Sources(a), Dataset::Sources(b)) => Arc::ptr_eq(a, b),
            (Dataset::Shops(a), Dataset::Shops(b)) => Arc::ptr_eq(a, b),
            (Dataset::Products(a), Dataset::Products(b)) => Arc::ptr_eq(a, b),
            (Dataset::StockBatches(a), Dataset::StockBatches(b)) => Arc::ptr_eq(a, b),
            (Dataset::Customers(a), Dataset::Customers(b)) => Arc::ptr_eq(a, b),
            (Dataset::SubStocks(a), Dataset::SubStocks(b)) => Arc::ptr_eq(a, b),
            (Dataset::DashboardStats(a), Dataset::DashboardStats(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Serialize the payload for display or export
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Dataset::Categories(v) => serde_json::to_value(v.as_ref()),
            Dataset::Brands(v) => serde_json::to_value(v.as_ref()),
            Dataset::Variants(v) => serde_json::to_value(v.as_ref()),
            Dataset::Colors(v) => serde_json::to_value(v.as_ref()),
            Dataset::Conditions(v) => serde_json::to_value(v.as_ref()),
            Dataset::Sources(v) => serde_json::to_value(v.as_ref()),
            Dataset::Shops(v) => serde_json::to_value(v.as_ref()),
            Dataset::Products(v) => serde_json::to_value(v.as_ref()),
            Dataset::StockBatches(v) => serde_json::to_value(v.as_ref()),
            Dataset::Customers(v) => serde_json::to_value(v.as_ref()),
            Dataset::SubStocks(v) => serde_json::to_value(v.as_ref()),
            Dataset::DashboardStats(v) => serde_json::to_value(v.as_ref()),
        }
    }
}

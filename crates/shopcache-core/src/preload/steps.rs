//! Step registry: which resources a user preloads, and in what order.
//!
//! The plan is a fixed table. Each optional slot is gated on a role
//! capability, so the order never depends on anything but `(role, has_shop)`.

use serde::{Deserialize, Serialize};

use crate::models::{Capabilities, Role, User};
use crate::resource::ResourceKey;

/// Lifecycle of one step: Pending -> Loading -> (Complete | Error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum StepStatus {
    Pending,
    Loading,
    Complete,
    Error,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Complete | StepStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoadStep {
    pub id: ResourceKey,
    pub label: String,
    pub status: StepStatus,
}

impl LoadStep {
    pub fn pending(id: ResourceKey) -> Self {
        Self {
            id,
            label: id.label().to_string(),
            status: StepStatus::Pending,
        }
    }
}

/// When an optional slot in the plan is included.
#[derive(Debug, Clone, Copy)]
enum Gate {
    Always,
    Shops,
    StockBatches,
    Customers,
    /// Shop-facing role that also has an assigned shop
    ShopStock,
}

impl Gate {
    fn admits(self, caps: Capabilities, has_shop: bool) -> bool {
        match self {
            Gate::Always => true,
            Gate::Shops => caps.shops,
            Gate::StockBatches => caps.stock_batches,
            Gate::Customers => caps.customers,
            Gate::ShopStock => caps.shop_facing && has_shop,
        }
    }
}

const PLAN: [(ResourceKey, Gate); 12] = [
    (ResourceKey::Categories, Gate::Always),
    (ResourceKey::Brands, Gate::Always),
    (ResourceKey::Variants, Gate::Always),
    (ResourceKey::Colors, Gate::Always),
    (ResourceKey::Conditions, Gate::Always),
    (ResourceKey::Sources, Gate::Always),
    (ResourceKey::Shops, Gate::Shops),
    (ResourceKey::Products, Gate::Always),
    (ResourceKey::StockBatches, Gate::StockBatches),
    (ResourceKey::Customers, Gate::Customers),
    (ResourceKey::SubStocks, Gate::ShopStock),
    (ResourceKey::DashboardStats, Gate::Always),
];

/// Ordered resource keys for a role, with or without an assigned shop.
pub fn plan(role: Role, has_shop: bool) -> Vec<ResourceKey> {
    let caps = role.capabilities();
    PLAN.iter()
        .filter(|(_, gate)| gate.admits(caps, has_shop))
        .map(|(key, _)| *key)
        .collect()
}

/// Fresh, all-pending step list for a user's preload run.
pub fn compute_steps(user: &User) -> Vec<LoadStep> {
    plan(user.role, user.has_shop())
        .into_iter()
        .map(LoadStep::pending)
        .collect()
}

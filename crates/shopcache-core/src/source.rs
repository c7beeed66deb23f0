//! The seam between the store and wherever records come from.

use async_trait::async_trait;

use crate::models::User;
use crate::resource::{Dataset, ResourceKey};

/// What to fetch. Shop-scoped resources need the shop id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub key: ResourceKey,
    pub shop: Option<String>,
}

impl FetchRequest {
    pub fn new(key: ResourceKey) -> Self {
        Self { key, shop: None }
    }

    pub fn for_user(key: ResourceKey, user: &User) -> Self {
        Self {
            key,
            shop: user.shop_id().map(str::to_string),
        }
    }
}

/// Remote data source: one fetch per resource, each of which may fail.
///
/// Errors are only logged and recorded by the store, never inspected.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> anyhow::Result<Dataset>;
}

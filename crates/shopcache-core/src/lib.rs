//! Client-side data layer for the shop inventory dashboard.
//!
//! After login, [`DataStore::run`] preloads the reference data a user's
//! role needs (catalog attributes in parallel, then shops, products, stock,
//! customers and dashboard totals in order), tracking per-step progress so
//! a shell can show a checklist and hold rendering until the store is
//! ready. Views then read from the cache, refresh single resources, or
//! follow it through a [`CacheMirror`].

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod preload;
pub mod resource;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError};
pub use cache::{CacheEntry, CacheMirror, DataStore, Feed, StoreConfig};
pub use config::Config;
pub use error::StoreError;
pub use preload::{LoadStep, PreloadSnapshot, PreloadStatus, StepStatus};
pub use resource::{Dataset, ResourceKey};
pub use source::{DataSource, FetchRequest};

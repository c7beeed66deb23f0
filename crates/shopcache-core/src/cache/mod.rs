//! In-memory cache of preloaded collections.
//!
//! This module provides the `DataStore` service that owns the cached
//! collections and preload run state, and `CacheMirror`, the read-through
//! adapter views use to follow it.
//!
//! Entries are replaced wholesale and handed out as shared `Arc`s, so a
//! reader never sees a half-written collection.

pub mod entry;
pub mod mirror;
pub mod store;

pub use entry::CacheEntry;
pub use mirror::{CacheMirror, Feed};
pub use store::{DataStore, StoreConfig, DEFAULT_STEP_TIMEOUT_SECS};

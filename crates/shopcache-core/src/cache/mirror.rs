//! Read-through mirror of store entries for a single view.
//!
//! A view mounts a `CacheMirror` over the resources it shows. If the store
//! has been populated (or a run is under way) the mirror copies the store's
//! entries and follows them. If not, say after a restart that skipped the
//! login flow, it fetches the resources itself and keeps the results
//! private; the shared cache is left alone.

use std::collections::BTreeMap;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::DataStore;
use crate::models::User;
use crate::resource::{Dataset, ResourceKey};
use crate::source::FetchRequest;

/// Where a mirror's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Following the shared store
    Cached,
    /// Fetched directly because the store was never populated
    Uncached,
}

pub struct CacheMirror {
    store: DataStore,
    keys: Vec<ResourceKey>,
    feed: Feed,
    values: BTreeMap<ResourceKey, Dataset>,
    ready: bool,
    revisions: watch::Receiver<u64>,
}

impl CacheMirror {
    /// Mount over `keys`. `user` scopes shop stock for the direct-fetch fallback.
    pub async fn mount(store: &DataStore, keys: &[ResourceKey], user: Option<&User>) -> Self {
        // Subscribe before reading so nothing published after the read is missed
        let revisions = store.watch_revisions();
        let mut mirror = Self {
            store: store.clone(),
            keys: keys.to_vec(),
            feed: Feed::Cached,
            values: BTreeMap::new(),
            ready: false,
            revisions,
        };

        if store.has_run() {
            mirror.copy_from_store();
        } else {
            mirror.feed = Feed::Uncached;
            mirror.fetch_direct(user).await;
        }
        mirror
    }

    pub fn feed(&self) -> Feed {
        self.feed
    }

    /// Whether the store's readiness gate was up at the last sync
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn keys(&self) -> &[ResourceKey] {
        &self.keys
    }

    pub fn get(&self, key: ResourceKey) -> Option<&Dataset> {
        self.values.get(&key)
    }

    /// Bring local values up to date with the store.
    ///
    /// Returns true when anything a view would re-render on changed: the
    /// readiness gate came up, or a mirrored entry was replaced. An
    /// uncached mirror switches over once the store is preloaded.
    pub fn sync(&mut self) -> bool {
        self.revisions.borrow_and_update();

        if self.feed == Feed::Uncached {
            if !self.store.is_preloaded() {
                return false;
            }
            debug!("Store preloaded, mirror switching to cached feed");
            self.feed = Feed::Cached;
            self.copy_from_store();
            return true;
        }

        let ready = self.store.is_preloaded();
        let mut changed = ready && !self.ready;
        self.ready = ready;

        for key in &self.keys {
            let current = self.store.get(*key);
            let replaced = self
                .values
                .get(key)
                .map(|held| !held.same_as(&current))
                .unwrap_or(true);
            if replaced {
                self.values.insert(*key, current);
                changed = true;
            }
        }
        changed
    }

    /// Wait for the store to change, then sync. Returns false once the
    /// store has been dropped.
    pub async fn changed(&mut self) -> bool {
        loop {
            if self.revisions.changed().await.is_err() {
                return false;
            }
            if self.sync() {
                return true;
            }
        }
    }

    fn copy_from_store(&mut self) {
        self.ready = self.store.is_preloaded();
        for key in &self.keys {
            self.values.insert(*key, self.store.get(*key));
        }
    }

    async fn fetch_direct(&mut self, user: Option<&User>) {
        debug!(keys = ?self.keys, "Store not populated, fetching directly");
        let store = &self.store;
        let fetches = self.keys.iter().map(|&key| {
            let request = match user {
                Some(user) => FetchRequest::for_user(key, user),
                None => FetchRequest::new(key),
            };
            async move {
                if key == ResourceKey::SubStocks && request.shop.is_none() {
                    return (key, Dataset::empty(key));
                }
                match store.fetch(&request).await {
                    Ok(data) => (key, data),
                    Err(e) => {
                        warn!(resource = %key, error = %e, "Direct fetch failed");
                        (key, Dataset::empty(key))
                    }
                }
            }
        });
        let results = join_all(fetches).await;
        self.values.extend(results);
    }
}

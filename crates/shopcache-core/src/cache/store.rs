//! The data store: cached collections plus the state of the preload run
//! that fills them.
//!
//! `DataStore` is a cheap-to-clone handle. Create one at startup and hand
//! clones to every consumer. All mutable state sits behind a single lock
//! that is never held across an await; changes are published on watch
//! channels so shells and mirrors can react without polling.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::CacheEntry;
use crate::auth::PreloadMarker;
use crate::error::StoreError;
use crate::models::{
    Brand, Category, Color, Condition, Customer, DashboardStats, Product, Shop, Source, StockBatch,
    SubStock, User, Variant,
};
use crate::preload::{LoadStep, PreloadEvent, PreloadSnapshot, PreloadState, PreloadStatus, StepOutcome};
use crate::resource::{Dataset, ResourceKey};
use crate::source::{DataSource, FetchRequest};

/// Default per-step timeout, matching the HTTP client timeout.
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound on one fetch; `None` waits forever
    pub step_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            step_timeout: Some(Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS)),
        }
    }
}

/// Lock-protected state.
pub(crate) struct Shared {
    /// Bumped by every run and every reset; results from older generations are dropped
    pub(crate) generation: u64,
    pub(crate) entries: BTreeMap<ResourceKey, CacheEntry>,
    pub(crate) run: PreloadState,
    pub(crate) is_preloaded: bool,
    /// User of the latest run, for shop-scoped refreshes
    pub(crate) user: Option<User>,
    /// Bumped whenever an entry is replaced or readiness changes
    pub(crate) revision: u64,
}

impl Shared {
    fn new() -> Self {
        Self {
            generation: 0,
            entries: empty_entries(),
            run: PreloadState::default(),
            is_preloaded: false,
            user: None,
            revision: 0,
        }
    }
}

fn empty_entries() -> BTreeMap<ResourceKey, CacheEntry> {
    ResourceKey::ALL
        .into_iter()
        .map(|key| (key, CacheEntry::empty(key)))
        .collect()
}

pub(crate) struct StoreInner {
    source: Arc<dyn DataSource>,
    config: StoreConfig,
    marker: PreloadMarker,
    shared: RwLock<Shared>,
    snapshot_tx: watch::Sender<PreloadSnapshot>,
    revision_tx: watch::Sender<u64>,
}

#[derive(Clone)]
pub struct DataStore {
    inner: Arc<StoreInner>,
}

impl DataStore {
    pub fn new(source: Arc<dyn DataSource>, marker: PreloadMarker, config: StoreConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(PreloadSnapshot::default());
        let (revision_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                source,
                config,
                marker,
                shared: RwLock::new(Shared::new()),
                snapshot_tx,
                revision_tx,
            }),
        }
    }

    pub fn config(&self) -> StoreConfig {
        self.inner.config
    }

    pub fn source(&self) -> Arc<dyn DataSource> {
        Arc::clone(&self.inner.source)
    }

    pub fn marker(&self) -> &PreloadMarker {
        &self.inner.marker
    }

    fn read(&self) -> RwLockReadGuard<'_, Shared> {
        self.inner.shared.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Shared> {
        self.inner.shared.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push the current state to subscribers. Called with the write lock held
    /// so published snapshots keep the order of the mutations.
    fn publish(&self, shared: &Shared) {
        self.inner
            .snapshot_tx
            .send_replace(PreloadSnapshot::from_state(&shared.run, shared.is_preloaded));
        self.inner.revision_tx.send_replace(shared.revision);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Latest cached value for a resource, empty if never loaded
    pub fn get(&self, key: ResourceKey) -> Dataset {
        self.entry(key).data
    }

    pub fn entry(&self, key: ResourceKey) -> CacheEntry {
        self.read()
            .entries
            .get(&key)
            .cloned()
            .unwrap_or_else(|| CacheEntry::empty(key))
    }

    pub fn snapshot(&self) -> PreloadSnapshot {
        let shared = self.read();
        PreloadSnapshot::from_state(&shared.run, shared.is_preloaded)
    }

    pub fn status(&self) -> PreloadStatus {
        self.read().run.status
    }

    pub fn progress(&self) -> u8 {
        self.read().run.progress
    }

    pub fn steps(&self) -> Vec<LoadStep> {
        self.read().run.steps.clone()
    }

    pub fn is_preloaded(&self) -> bool {
        self.read().is_preloaded
    }

    /// Whether any run has started since creation or the last reset
    pub fn has_run(&self) -> bool {
        let shared = self.read();
        shared.is_preloaded || shared.run.status != PreloadStatus::Idle
    }

    /// Snapshot stream for a shell's progress checklist
    pub fn subscribe(&self) -> watch::Receiver<PreloadSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Fires whenever an entry is replaced or readiness changes
    pub fn watch_revisions(&self) -> watch::Receiver<u64> {
        self.inner.revision_tx.subscribe()
    }

    // ===== Typed reads =====

    pub fn categories(&self) -> Arc<Vec<Category>> {
        match self.get(ResourceKey::Categories) {
            Dataset::Categories(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn brands(&self) -> Arc<Vec<Brand>> {
        match self.get(ResourceKey::Brands) {
            Dataset::Brands(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn variants(&self) -> Arc<Vec<Variant>> {
        match self.get(ResourceKey::Variants) {
            Dataset::Variants(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn colors(&self) -> Arc<Vec<Color>> {
        match self.get(ResourceKey::Colors) {
            Dataset::Colors(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn conditions(&self) -> Arc<Vec<Condition>> {
        match self.get(ResourceKey::Conditions) {
            Dataset::Conditions(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn sources(&self) -> Arc<Vec<Source>> {
        match self.get(ResourceKey::Sources) {
            Dataset::Sources(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn shops(&self) -> Arc<Vec<Shop>> {
        match self.get(ResourceKey::Shops) {
            Dataset::Shops(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn products(&self) -> Arc<Vec<Product>> {
        match self.get(ResourceKey::Products) {
            Dataset::Products(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn stock_batches(&self) -> Arc<Vec<StockBatch>> {
        match self.get(ResourceKey::StockBatches) {
            Dataset::StockBatches(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn customers(&self) -> Arc<Vec<Customer>> {
        match self.get(ResourceKey::Customers) {
            Dataset::Customers(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn sub_stocks(&self) -> Arc<Vec<SubStock>> {
        match self.get(ResourceKey::SubStocks) {
            Dataset::SubStocks(v) => v,
            _ => Arc::default(),
        }
    }

    pub fn dashboard_stats(&self) -> Arc<DashboardStats> {
        match self.get(ResourceKey::DashboardStats) {
            Dataset::DashboardStats(v) => v,
            _ => Arc::default(),
        }
    }

    // =========================================================================
    // Refresh and reset
    // =========================================================================

    /// Re-fetch one resource and swap it in.
    ///
    /// On failure the previous entry stays in place and the error is
    /// returned. Run state and other entries are never touched.
    ///
    /// A refresh still in flight when a reset or a new run starts writes
    /// nothing and returns `StoreError::Superseded`; the newer state wins.
    pub async fn refresh(&self, key: ResourceKey) -> Result<Dataset, StoreError> {
        let (generation, request) = {
            let shared = self.read();
            let request = match shared.user {
                Some(ref user) => FetchRequest::for_user(key, user),
                None => FetchRequest::new(key),
            };
            (shared.generation, request)
        };

        if key == ResourceKey::SubStocks && request.shop.is_none() {
            warn!(resource = %key, "Refresh skipped - no assigned shop");
            return Err(StoreError::MissingShop);
        }

        debug!(resource = %key, "Refreshing resource");
        let data = match self.fetch(&request).await {
            Ok(data) => data,
            Err(e) => {
                warn!(resource = %key, error = %e, "Refresh failed, keeping cached data");
                return Err(e);
            }
        };

        let mut shared = self.write();
        if shared.generation != generation {
            debug!(resource = %key, "Refresh result discarded - store moved on");
            return Err(StoreError::Superseded(key));
        }
        shared.entries.insert(key, CacheEntry::new(data.clone()));
        shared.revision += 1;
        self.publish(&shared);
        info!(resource = %key, count = data.len(), "Resource refreshed");
        Ok(data)
    }

    /// Drop every cached entry and return to `Idle`. Called on logout.
    ///
    /// Any run still in flight is orphaned: its late results are discarded.
    pub fn reset(&self) {
        {
            let mut shared = self.write();
            let generation = shared.generation + 1;
            let revision = shared.revision + 1;
            *shared = Shared {
                generation,
                revision,
                ..Shared::new()
            };
            self.publish(&shared);
        }
        if let Err(e) = self.inner.marker.clear() {
            warn!(error = %e, "Failed to clear preload marker");
        }
        info!("Data store reset");
    }

    // =========================================================================
    // Run bookkeeping (driven by the preload orchestrator)
    // =========================================================================

    /// Fetch through the data source, bounded by the step timeout
    pub(crate) async fn fetch(&self, request: &FetchRequest) -> Result<Dataset, StoreError> {
        let key = request.key;
        let fetch = self.inner.source.fetch(request);
        let result = match self.inner.config.step_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| StoreError::Timeout { key, after: limit })?,
            None => fetch.await,
        };
        let data = result.map_err(|cause| StoreError::Fetch { key, cause })?;
        if data.key() != key {
            return Err(StoreError::Fetch {
                key,
                cause: anyhow::anyhow!("Data source returned {} instead", data.key()),
            });
        }
        Ok(data)
    }

    /// Claim a new generation for a run. Older runs stop writing from here on.
    pub(crate) fn claim_run(&self, user: &User) -> u64 {
        let mut shared = self.write();
        shared.generation += 1;
        shared.user = Some(user.clone());
        // Readiness is raised once per run, at its end
        if shared.is_preloaded {
            shared.is_preloaded = false;
            shared.revision += 1;
            self.publish(&shared);
        }
        shared.generation
    }

    /// Apply a run event if `generation` is still current.
    pub(crate) fn apply(&self, generation: u64, event: PreloadEvent) -> bool {
        let mut shared = self.write();
        if shared.generation != generation {
            return false;
        }
        shared.run.apply(event);
        self.publish(&shared);
        true
    }

    /// Record the result of one step: write the cache on success, then settle it.
    pub(crate) fn settle(
        &self,
        generation: u64,
        key: ResourceKey,
        result: Result<Dataset, StoreError>,
    ) -> bool {
        let mut shared = self.write();
        if shared.generation != generation {
            debug!(resource = %key, "Dropping result from superseded run");
            return false;
        }
        let outcome = match result {
            Ok(data) => {
                debug!(resource = %key, count = data.len(), "Step loaded");
                shared.entries.insert(key, CacheEntry::new(data));
                shared.revision += 1;
                StepOutcome::Loaded
            }
            Err(e) => {
                warn!(resource = %key, error = %e, "Step failed, keeping previous data");
                StepOutcome::Failed
            }
        };
        shared.run.apply(PreloadEvent::StepSettled { key, outcome });
        self.publish(&shared);
        true
    }

    /// Mark the run complete and raise the readiness gate.
    pub(crate) fn finish_run(&self, generation: u64) -> bool {
        {
            let mut shared = self.write();
            if shared.generation != generation {
                return false;
            }
            shared.run.apply(PreloadEvent::Finished);
            shared.is_preloaded = true;
            shared.revision += 1;
            self.publish(&shared);
        }
        if let Err(e) = self.inner.marker.set() {
            warn!(error = %e, "Failed to record preload marker");
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.read().generation
    }
}

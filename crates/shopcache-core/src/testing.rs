//! Scripted in-memory data source for store and orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::cache::DataStore;
use crate::models::{
    Brand, Category, Color, Condition, Customer, DashboardStats, Product, Shop, Source, StockBatch,
    SubStock, Variant,
};
use crate::resource::{Dataset, ResourceKey};
use crate::source::{DataSource, FetchRequest};

#[derive(Default)]
struct Script {
    failing: HashSet<ResourceKey>,
    hanging: HashSet<ResourceKey>,
    gated: HashSet<ResourceKey>,
    panicking: HashSet<ResourceKey>,
    mislabeled: HashSet<ResourceKey>,
    delay: Option<Duration>,
    calls: Vec<ResourceKey>,
    versions: HashMap<ResourceKey, u32>,
    observed_progress: Vec<u8>,
}

/// Answers every fetch with one record named `<key>-v<n>`, where `n` counts
/// successful fetches of that key. Individual keys can be told to fail,
/// hang, wait on a gate, panic or return the wrong resource.
pub(crate) struct ScriptedSource {
    script: Mutex<Script>,
    gate: Semaphore,
    observer: Mutex<Option<DataStore>>,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            gate: Semaphore::new(0),
            observer: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn fail(&self, key: ResourceKey) {
        self.lock().failing.insert(key);
    }

    pub(crate) fn hang(&self, key: ResourceKey) {
        self.lock().hanging.insert(key);
    }

    pub(crate) fn gate(&self, key: ResourceKey) {
        self.lock().gated.insert(key);
    }

    pub(crate) fn open_gate(&self) {
        self.gate.add_permits(1);
    }

    pub(crate) fn panic_on(&self, key: ResourceKey) {
        self.lock().panicking.insert(key);
    }

    pub(crate) fn mislabel(&self, key: ResourceKey) {
        self.lock().mislabeled.insert(key);
    }

    pub(crate) fn delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Record the store's progress at the start of every fetch
    pub(crate) fn observe(&self, store: DataStore) {
        *self.observer.lock().unwrap_or_else(PoisonError::into_inner) = Some(store);
    }

    pub(crate) fn calls(&self) -> Vec<ResourceKey> {
        self.lock().calls.clone()
    }

    pub(crate) fn observed_progress(&self) -> Vec<u8> {
        self.lock().observed_progress.clone()
    }

    pub(crate) async fn wait_for_call(&self, key: ResourceKey) {
        while !self.lock().calls.contains(&key) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

fn dataset_for(key: ResourceKey, version: u32, shop: Option<&str>) -> Dataset {
    let label = format!("{}-v{}", key, version);
    match key {
        ResourceKey::Categories => Dataset::Categories(Arc::new(vec![Category {
            id: label.clone(),
            name: label,
            ..Default::default()
        }])),
        ResourceKey::Brands => Dataset::Brands(Arc::new(vec![Brand {
            id: label.clone(),
            name: label,
            ..Default::default()
        }])),
        ResourceKey::Variants => Dataset::Variants(Arc::new(vec![Variant {
            id: label.clone(),
            name: label,
            ..Default::default()
        }])),
        ResourceKey::Colors => Dataset::Colors(Arc::new(vec![Color {
            id: label.clone(),
            name: label,
            ..Default::default()
        }])),
        ResourceKey::Conditions => Dataset::Conditions(Arc::new(vec![Condition {
            id: label.clone(),
            name: label,
            ..Default::default()
        }])),
        ResourceKey::Sources => Dataset::Sources(Arc::new(vec![Source {
            id: label.clone(),
            name: label,
            ..Default::default()
        }])),
        ResourceKey::Shops => Dataset::Shops(Arc::new(vec![Shop {
            id: label.clone(),
            name: label,
            ..Default::default()
        }])),
        ResourceKey::Products => Dataset::Products(Arc::new(vec![Product {
            id: label.clone(),
            name: label,
            ..Default::default()
        }])),
        ResourceKey::StockBatches => Dataset::StockBatches(Arc::new(vec![StockBatch {
            id: label.clone(),
            product: label,
            ..Default::default()
        }])),
        ResourceKey::Customers => Dataset::Customers(Arc::new(vec![Customer {
            id: label.clone(),
            name: label,
            ..Default::default()
        }])),
        ResourceKey::SubStocks => Dataset::SubStocks(Arc::new(vec![SubStock {
            id: label.clone(),
            shop: shop.unwrap_or_default().to_string(),
            product: label,
            ..Default::default()
        }])),
        ResourceKey::DashboardStats => Dataset::DashboardStats(Arc::new(DashboardStats {
            total_products: u64::from(version),
            ..Default::default()
        })),
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Dataset> {
        let key = request.key;
        let observer = self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let progress = observer.map(|store| store.progress());

        let (fail, hang, gated, panics, mislabeled, delay) = {
            let mut script = self.lock();
            script.calls.push(key);
            if let Some(progress) = progress {
                script.observed_progress.push(progress);
            }
            (
                script.failing.contains(&key),
                script.hanging.contains(&key),
                script.gated.contains(&key),
                script.panicking.contains(&key),
                script.mislabeled.contains(&key),
                script.delay,
            )
        };

        if panics {
            panic!("scripted panic while fetching {}", key);
        }
        if gated {
            let _permit = self.gate.acquire().await;
        }
        if hang {
            futures::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            bail!("scripted failure for {}", key);
        }
        if mislabeled {
            let other = if key == ResourceKey::Brands {
                ResourceKey::Colors
            } else {
                ResourceKey::Brands
            };
            return Ok(Dataset::empty(other));
        }

        let version = {
            let mut script = self.lock();
            let version = script.versions.entry(key).or_insert(0);
            *version += 1;
            *version
        };
        Ok(dataset_for(key, version, request.shop.as_deref()))
    }
}

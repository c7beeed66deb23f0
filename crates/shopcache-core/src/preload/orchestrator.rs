//! Preload orchestration.
//!
//! A run loads the shared reference data concurrently, then walks the
//! remaining steps one at a time. Individual failures are recorded on the
//! step and never stop the run.

use futures::future::join_all;
use tracing::{error, info};

use super::state::{PreloadEvent, PreloadSnapshot};
use super::steps::compute_steps;
use crate::cache::DataStore;
use crate::models::User;
use crate::resource::ResourceKey;
use crate::source::FetchRequest;

impl DataStore {
    /// Preload everything `user` needs, filling the cache.
    ///
    /// Returns the final snapshot once every step has settled. Starting a
    /// run supersedes any run still in flight; the older run's remaining
    /// results are dropped.
    pub async fn run(&self, user: &User) -> PreloadSnapshot {
        let generation = self.claim_run(user);
        info!(role = ?user.role, has_shop = user.has_shop(), generation, "Starting preload");

        // The body runs on its own task so a panic in it lands in run state
        // instead of unwinding into the caller.
        let store = self.clone();
        let run_user = user.clone();
        let handle = tokio::spawn(async move { store.execute(generation, &run_user).await });

        if let Err(e) = handle.await {
            let message = format!("Preload failed: {}", e);
            error!(error = %e, "Preload aborted");
            self.apply(generation, PreloadEvent::Failed { message });
        }

        self.snapshot()
    }

    async fn execute(&self, generation: u64, user: &User) {
        let steps = compute_steps(user);
        let total = steps.len();
        let (shared, sequential): (Vec<ResourceKey>, Vec<ResourceKey>) =
            steps.iter().map(|s| s.id).partition(|key| key.is_shared());

        if !self.apply(generation, PreloadEvent::Started { steps }) {
            return;
        }

        // Every shared step is marked loading before any request goes out;
        // each one settles on its own as its response arrives.
        let fan_out: Vec<_> = shared
            .into_iter()
            .map(|key| {
                self.apply(generation, PreloadEvent::StepStarted(key));
                let request = FetchRequest::for_user(key, user);
                async move {
                    let result = self.fetch(&request).await;
                    self.settle(generation, key, result)
                }
            })
            .collect();
        join_all(fan_out).await;

        for key in sequential {
            if !self.apply(generation, PreloadEvent::StepStarted(key)) {
                info!(generation, "Preload superseded, stopping");
                return;
            }
            let result = self.fetch(&FetchRequest::for_user(key, user)).await;
            self.settle(generation, key, result);
        }

        if self.finish_run(generation) {
            let snapshot = self.snapshot();
            let failed: Vec<_> = snapshot.failed_steps().map(|s| s.id.as_str()).collect();
            info!(steps = total, failed = ?failed, "Preload complete");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::auth::PreloadMarker;
    use crate::cache::StoreConfig;
    use crate::models::Role;
    use crate::preload::{progress_for, PreloadStatus, StepStatus};
    use crate::testing::ScriptedSource;
    use ResourceKey::*;

    fn store_with(source: Arc<ScriptedSource>) -> DataStore {
        DataStore::new(source, PreloadMarker::in_memory(), StoreConfig::default())
    }

    fn ids(snapshot: &PreloadSnapshot) -> Vec<ResourceKey> {
        snapshot.steps.iter().map(|s| s.id).collect()
    }

    #[tokio::test]
    async fn test_shop_manager_with_shop_end_to_end() {
        let source = Arc::new(ScriptedSource::new());
        let store = store_with(source.clone());
        let user = User::new(Role::ShopManager, Some("s1"));

        let snapshot = store.run(&user).await;

        assert_eq!(
            ids(&snapshot),
            vec![
                Categories, Brands, Variants, Colors, Conditions, Sources, Products, Customers,
                SubStocks, DashboardStats
            ]
        );
        assert_eq!(snapshot.status, PreloadStatus::Complete);
        assert_eq!(snapshot.progress, 100);
        assert!(snapshot.is_preloaded);
        assert!(snapshot.steps.iter().all(|s| s.status == StepStatus::Complete));
        assert_eq!(store.sub_stocks()[0].shop, "s1");
        assert!(store.marker().is_set());
        // Not fetched for this role
        assert!(!store.entry(Shops).is_loaded());
        assert!(!store.entry(StockBatches).is_loaded());
    }

    #[tokio::test]
    async fn test_sequential_steps_run_in_registry_order() {
        let source = Arc::new(ScriptedSource::new());
        let store = store_with(source.clone());
        store.run(&User::new(Role::SuperAdmin, Some("s1"))).await;

        let calls = source.calls();
        let (shared, tail) = calls.split_at(6);
        let mut shared = shared.to_vec();
        shared.sort();
        assert_eq!(shared, ResourceKey::SHARED.to_vec());
        assert_eq!(
            tail,
            &[Shops, Products, StockBatches, Customers, SubStocks, DashboardStats]
        );
    }

    #[tokio::test]
    async fn test_fan_out_failure_does_not_block_completion() {
        let source = Arc::new(ScriptedSource::new());
        source.fail(Colors);
        let store = store_with(source.clone());

        let snapshot = store.run(&User::new(Role::Admin, None)).await;

        assert_eq!(snapshot.status, PreloadStatus::Complete);
        assert_eq!(snapshot.progress, 100);
        assert!(snapshot.is_preloaded);
        for step in &snapshot.steps {
            let expected = if step.id == Colors { StepStatus::Error } else { StepStatus::Complete };
            assert_eq!(step.status, expected, "{}", step.id);
        }
        assert!(store.colors().is_empty());
        assert!(!store.brands().is_empty());
    }

    #[tokio::test]
    async fn test_stalled_shared_step_does_not_hold_back_the_others() {
        let source = Arc::new(ScriptedSource::new());
        source.gate(Categories);
        let store = store_with(source.clone());

        let running = {
            let store = store.clone();
            tokio::spawn(async move { store.run(&User::new(Role::Admin, None)).await })
        };
        let complete = |store: &DataStore| {
            store
                .steps()
                .iter()
                .filter(|s| s.status == StepStatus::Complete)
                .count()
        };
        tokio::time::timeout(Duration::from_secs(5), async {
            while complete(&store) < 5 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("the other shared steps settle while categories is held");

        for step in store.steps() {
            let expected = match step.id {
                Categories => StepStatus::Loading,
                key if key.is_shared() => StepStatus::Complete,
                _ => StepStatus::Pending,
            };
            assert_eq!(step.status, expected, "{}", step.id);
        }
        let mut calls = source.calls();
        calls.sort();
        assert_eq!(calls, ResourceKey::SHARED.to_vec());

        source.open_gate();
        let snapshot = running.await.unwrap();
        assert_eq!(snapshot.status, PreloadStatus::Complete);
        assert_eq!(snapshot.progress, 100);
        assert!(snapshot.steps.iter().all(|s| s.status == StepStatus::Complete));
    }

    #[tokio::test]
    async fn test_failed_step_keeps_previous_cache_entry() {
        let source = Arc::new(ScriptedSource::new());
        let store = store_with(source.clone());
        let user = User::new(Role::InventoryManager, None);

        store.run(&user).await;
        let batches = store.get(StockBatches);
        assert_eq!(store.stock_batches()[0].id, "stockBatches-v1");

        source.fail(StockBatches);
        let snapshot = store.run(&user).await;

        assert_eq!(snapshot.status, PreloadStatus::Complete);
        assert!(store.get(StockBatches).same_as(&batches));
        // Everything else was replaced by the second run
        assert_eq!(store.products()[0].id, "products-v2");
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_ends_at_100() {
        let source = Arc::new(ScriptedSource::new());
        source.delay(Duration::from_millis(2));
        let store = store_with(source);
        let mut rx = store.subscribe();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                seen.push(snapshot.progress);
                if snapshot.is_preloaded {
                    break;
                }
            }
            seen
        });

        let user = User::new(Role::SuperAdmin, Some("s1"));
        store.run(&user).await;
        let seen = watcher.await.unwrap();

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test]
    async fn test_progress_tracks_settled_count_during_sequential_steps() {
        let source = Arc::new(ScriptedSource::new());
        let store = store_with(source.clone());
        source.observe(store.clone());
        let user = User::new(Role::SuperAdmin, None);
        let total = 11;

        store.run(&user).await;

        // At dispatch of each sequential step, every earlier step has settled
        let observed = source.observed_progress();
        let tail = &observed[6..];
        for (i, progress) in tail.iter().enumerate() {
            assert_eq!(*progress, progress_for(6 + i, total));
        }
    }

    #[tokio::test]
    async fn test_hung_step_times_out_as_error() {
        let source = Arc::new(ScriptedSource::new());
        source.hang(Products);
        let store = DataStore::new(
            source,
            PreloadMarker::in_memory(),
            StoreConfig {
                step_timeout: Some(Duration::from_millis(20)),
            },
        );

        let snapshot = store.run(&User::new(Role::Admin, None)).await;

        assert_eq!(snapshot.status, PreloadStatus::Complete);
        let products = snapshot.steps.iter().find(|s| s.id == Products).unwrap();
        assert_eq!(products.status, StepStatus::Error);
        assert!(snapshot.is_preloaded);
    }

    #[tokio::test]
    async fn test_panic_in_run_sets_error_status() {
        let source = Arc::new(ScriptedSource::new());
        source.panic_on(DashboardStats);
        let store = store_with(source);

        let snapshot = store.run(&User::new(Role::Admin, None)).await;

        assert_eq!(snapshot.status, PreloadStatus::Error);
        assert!(snapshot.error.as_deref().unwrap_or_default().starts_with("Preload failed"));
        assert!(!snapshot.is_preloaded);
        assert!(!store.marker().is_set());
    }

    #[tokio::test]
    async fn test_refresh_after_run_touches_only_one_key() {
        let source = Arc::new(ScriptedSource::new());
        let store = store_with(source);
        store.run(&User::new(Role::SuperAdmin, None)).await;

        let before = store.snapshot();
        let categories = store.get(Categories);
        let brands = store.get(Brands);

        store.refresh(Products).await.unwrap();

        assert_eq!(store.products()[0].id, "products-v2");
        assert!(store.get(Categories).same_as(&categories));
        assert!(store.get(Brands).same_as(&brands));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_refresh_sub_stocks_uses_run_user_shop() {
        let source = Arc::new(ScriptedSource::new());
        let store = store_with(source);
        store.run(&User::new(Role::InventoryManager, Some("s7"))).await;

        store.refresh(SubStocks).await.unwrap();
        assert_eq!(store.sub_stocks()[0].shop, "s7");
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let source = Arc::new(ScriptedSource::new());
        let store = store_with(source);
        store.run(&User::new(Role::SuperAdmin, Some("s1"))).await;
        assert!(store.marker().is_set());

        store.reset();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, PreloadStatus::Idle);
        assert!(snapshot.steps.is_empty());
        assert_eq!(snapshot.progress, 0);
        assert!(!snapshot.is_preloaded);
        assert!(!store.marker().is_set());
        assert!(!store.has_run());
        for key in ResourceKey::ALL {
            assert!(!store.entry(key).is_loaded(), "{}", key);
        }
        assert!(store.products().is_empty());
    }

    #[tokio::test]
    async fn test_reset_during_run_is_not_overwritten() {
        let source = Arc::new(ScriptedSource::new());
        source.gate(Products);
        let store = store_with(source.clone());
        let user = User::new(Role::Admin, None);

        let running = {
            let store = store.clone();
            tokio::spawn(async move { store.run(&user).await })
        };
        source.wait_for_call(Products).await;

        store.reset();
        source.open_gate();
        running.await.unwrap();

        assert_eq!(store.status(), PreloadStatus::Idle);
        assert!(!store.is_preloaded());
        assert!(!store.entry(Products).is_loaded());
        assert!(!store.entry(Categories).is_loaded());
        assert!(!store.marker().is_set());
    }

    #[tokio::test]
    async fn test_rerun_lowers_readiness_until_it_finishes() {
        let source = Arc::new(ScriptedSource::new());
        let store = store_with(source.clone());
        let user = User::new(Role::Admin, None);
        store.run(&user).await;
        assert!(store.is_preloaded());

        source.gate(Products);
        let running = {
            let store = store.clone();
            tokio::spawn(async move { store.run(&user).await })
        };
        while source.calls().iter().filter(|k| **k == Products).count() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(!store.is_preloaded());
        assert_eq!(store.status(), PreloadStatus::Loading);

        source.open_gate();
        let snapshot = running.await.unwrap();
        assert!(snapshot.is_preloaded);
        assert_eq!(store.products()[0].id, "products-v2");
    }

    #[tokio::test]
    async fn test_newer_run_supersedes_older() {
        let source = Arc::new(ScriptedSource::new());
        source.gate(Products);
        let store = store_with(source.clone());

        let first = {
            let store = store.clone();
            let user = User::new(Role::Admin, None);
            tokio::spawn(async move { store.run(&user).await })
        };
        source.wait_for_call(Products).await;
        source.open_gate();
        let second = store.run(&User::new(Role::SuperAdmin, None)).await;
        first.await.unwrap();

        // Final state belongs to the second run's step list
        assert_eq!(second.status, PreloadStatus::Complete);
        assert_eq!(store.snapshot().steps, second.steps);
        assert!(store.snapshot().steps.iter().any(|s| s.id == Shops));
        assert!(store.is_preloaded());
    }
}

//! Remote catalog assembly with a durable cache

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::version::error::RegistryError;
use crate::version::registry::PackageRegistry;
use crate::version::types::{Catalog, PackageRecord};
use crate::watch::error::StoreError;
use crate::watch::store::{CATALOG_FLAG, FlagStore, load_json, save_json};

/// Builds the vendor catalog from the registry, or restores it from the store
pub struct CatalogFetcher<S: FlagStore> {
    registry: Arc<dyn PackageRegistry>,
    store: Arc<S>,
    vendor: String,
    concurrency: usize,
}

impl<S: FlagStore> CatalogFetcher<S> {
    /// `concurrency` caps the number of detail requests in flight
    pub fn new(
        registry: Arc<dyn PackageRegistry>,
        store: Arc<S>,
        vendor: &str,
        concurrency: usize,
    ) -> Self {
        Self {
            registry,
            store,
            vendor: vendor.to_string(),
            concurrency: concurrency.max(1),
        }
    }

    /// Return the vendor catalog.
    ///
    /// With `use_cache` a stored catalog is returned as-is without touching
    /// the network. Otherwise every listed package is fetched; packages that
    /// fail are logged and left out. A failed listing yields an empty catalog.
    pub async fn fetch_catalog(&self, use_cache: bool) -> Catalog {
        if use_cache && let Some(catalog) = self.cached_catalog() {
            debug!("Using cached catalog with {} packages", catalog.len());
            return catalog;
        }

        let package_names = match self.registry.list_packages(&self.vendor).await {
            Ok(names) => names,
            Err(e) => {
                error!("Failed to list packages for vendor {}: {}", self.vendor, e);
                return Catalog::new();
            }
        };

        let requested = package_names.len();
        let catalog = self.fetch_records(package_names).await;

        info!(
            "Fetched {} of {} packages for vendor {}",
            catalog.len(),
            requested,
            self.vendor
        );

        let _ = save_json(&*self.store, CATALOG_FLAG, &catalog)
            .inspect_err(|e| error!("Failed to cache catalog: {}", e));

        catalog
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Fetch the latest release of a single package
    pub async fn fetch_package(&self, package_name: &str) -> Result<PackageRecord, RegistryError> {
        self.registry.fetch_package(package_name).await
    }

    /// Drop the cached catalog so the next fetch goes to the network
    pub fn invalidate(&self) -> Result<(), StoreError> {
        info!("Invalidating cached catalog");
        self.store.delete_flag(CATALOG_FLAG)
    }

    fn cached_catalog(&self) -> Option<Catalog> {
        load_json::<S, Catalog>(&*self.store, CATALOG_FLAG)
            .inspect_err(|e| warn!("Ignoring unreadable catalog cache: {}", e))
            .ok()
            .flatten()
    }

    async fn fetch_records(&self, package_names: Vec<String>) -> Catalog {
        let records: Vec<Option<PackageRecord>> = stream::iter(package_names)
            .map(|package_name| async move {
                match self.registry.fetch_package(&package_name).await {
                    Ok(record) => {
                        debug!("{} latest is {}", package_name, record.version);
                        Some(record)
                    }
                    Err(e) if e.is_timeout() => {
                        warn!("Timed out fetching {}: {}", package_name, e);
                        None
                    }
                    Err(e) => {
                        warn!("Failed to fetch {}: {}", package_name, e);
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        records.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::registries::PackagistRegistry;
    use crate::version::registry::MockPackageRegistry;
    use crate::version::types::PackageId;
    use crate::watch::store::SqliteStore;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn record(name: &str, version: &str) -> PackageRecord {
        PackageRecord {
            identifier: PackageId::new(name),
            display_name: name.to_string(),
            description: String::new(),
            version: version.to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn fetcher(registry: MockPackageRegistry, store: Arc<SqliteStore>) -> CatalogFetcher<SqliteStore> {
        CatalogFetcher::new(Arc::new(registry), store, "infrangible", 4)
    }

    #[tokio::test]
    async fn fetch_catalog_skips_failed_packages() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let mut registry = MockPackageRegistry::new();
        registry
            .expect_list_packages()
            .withf(|vendor| vendor == "infrangible")
            .times(1)
            .returning(|_| {
                Ok(["a", "b", "c", "d", "e"]
                    .iter()
                    .map(|n| format!("infrangible/{}", n))
                    .collect())
            });
        registry
            .expect_fetch_package()
            .times(5)
            .returning(|name| match name {
                "infrangible/b" | "infrangible/d" => Err(RegistryError::Parse("boom".to_string())),
                _ => Ok(record(name, "1.0.0")),
            });

        let catalog = fetcher(registry, store).fetch_catalog(false).await;

        let ids: Vec<&str> = catalog.records().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["infrangible/a", "infrangible/c", "infrangible/e"]);
    }

    /// Registry that holds each detail request open and records the peak
    /// number of requests in flight
    #[derive(Default)]
    struct SlowRegistry {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PackageRegistry for SlowRegistry {
        async fn list_packages(&self, vendor: &str) -> Result<Vec<String>, RegistryError> {
            Ok((0..12).map(|i| format!("{}/m2-{}", vendor, i)).collect())
        }

        async fn fetch_package(&self, package_name: &str) -> Result<PackageRecord, RegistryError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(record(package_name, "1.0.0"))
        }
    }

    #[tokio::test]
    async fn fetch_catalog_caps_requests_in_flight() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let registry = Arc::new(SlowRegistry::default());

        let catalog = CatalogFetcher::new(registry.clone(), store, "infrangible", 3)
            .fetch_catalog(false)
            .await;

        assert_eq!(catalog.len(), 12);
        assert_eq!(registry.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fetch_catalog_skips_timed_out_package() {
        let mut server = mockito::Server::new_async().await;
        let _list_mock = server
            .mock("GET", "/packages/list.json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"packageNames": ["infrangible/m2-core", "infrangible/m2-slow"]}"#)
            .create_async()
            .await;
        let _core_mock = server
            .mock("GET", "/packages/infrangible/m2-core.json")
            .with_status(200)
            .with_body(
                r#"{"package": {"versions": [{"version": "1.0.0", "time": "2024-01-01T00:00:00+00:00"}]}}"#,
            )
            .create_async()
            .await;
        let _slow_mock = server
            .mock("GET", "/packages/infrangible/m2-slow.json")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(1000));
                std::io::Write::write_all(w, br#"{"package": {"versions": []}}"#)
            })
            .create_async()
            .await;

        let registry = PackagistRegistry::new(&server.url(), Duration::from_millis(300)).unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let catalog = CatalogFetcher::new(Arc::new(registry), store, "infrangible", 4)
            .fetch_catalog(false)
            .await;

        let ids: Vec<&str> = catalog.records().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["infrangible/m2-core"]);
    }

    #[tokio::test]
    async fn fetch_catalog_returns_empty_when_listing_fails() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let mut registry = MockPackageRegistry::new();
        registry
            .expect_list_packages()
            .times(1)
            .returning(|v| Err(RegistryError::NotFound(v.to_string())));
        registry.expect_fetch_package().never();

        let catalog = fetcher(registry, store.clone()).fetch_catalog(false).await;

        assert!(catalog.is_empty());
        // a failed listing must not overwrite the cache
        assert_eq!(store.get_flag(CATALOG_FLAG).unwrap(), None);
    }

    #[tokio::test]
    async fn fetch_catalog_uses_cache_without_network() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let cached: Catalog = [record("infrangible/a", "2.0.0")].into_iter().collect();
        save_json(&*store, CATALOG_FLAG, &cached).unwrap();

        let mut registry = MockPackageRegistry::new();
        registry.expect_list_packages().never();
        registry.expect_fetch_package().never();

        let catalog = fetcher(registry, store).fetch_catalog(true).await;

        assert_eq!(catalog, cached);
    }

    #[tokio::test]
    async fn fetch_catalog_writes_network_result_to_cache() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let mut registry = MockPackageRegistry::new();
        registry
            .expect_list_packages()
            .times(1)
            .returning(|_| Ok(vec!["infrangible/a".to_string()]));
        registry
            .expect_fetch_package()
            .times(1)
            .returning(|name| Ok(record(name, "1.2.0")));

        let fetcher = fetcher(registry, store.clone());
        let first = fetcher.fetch_catalog(true).await;
        // second call is served from the cache; the mock allows one request only
        let second = fetcher.fetch_catalog(true).await;

        assert_eq!(first, second);
        let stored: Option<Catalog> = load_json(&*store, CATALOG_FLAG).unwrap();
        assert_eq!(stored, Some(first));
    }

    #[tokio::test]
    async fn fetch_catalog_ignores_cache_when_not_requested() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let cached: Catalog = [record("infrangible/a", "1.0.0")].into_iter().collect();
        save_json(&*store, CATALOG_FLAG, &cached).unwrap();

        let mut registry = MockPackageRegistry::new();
        registry
            .expect_list_packages()
            .times(1)
            .returning(|_| Ok(vec!["infrangible/a".to_string()]));
        registry
            .expect_fetch_package()
            .times(1)
            .returning(|name| Ok(record(name, "1.1.0")));

        let catalog = fetcher(registry, store).fetch_catalog(false).await;

        assert_eq!(
            catalog.get(&PackageId::new("infrangible/a")).unwrap().version,
            "1.1.0"
        );
    }

    #[tokio::test]
    async fn fetch_catalog_falls_back_to_network_on_corrupt_cache() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.save_flag(CATALOG_FLAG, "{broken").unwrap();

        let mut registry = MockPackageRegistry::new();
        registry
            .expect_list_packages()
            .times(1)
            .returning(|_| Ok(vec![]));

        let catalog = fetcher(registry, store).fetch_catalog(true).await;

        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn fetch_package_delegates_to_registry() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let mut registry = MockPackageRegistry::new();
        registry
            .expect_fetch_package()
            .withf(|name| name == "infrangible/m2-core")
            .times(1)
            .returning(|name| Ok(record(name, "3.1.0")));

        let record = fetcher(registry, store)
            .fetch_package("infrangible/m2-core")
            .await
            .unwrap();

        assert_eq!(record.version, "3.1.0");
    }

    #[tokio::test]
    async fn invalidate_removes_cached_catalog() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.save_flag(CATALOG_FLAG, "{}").unwrap();

        let registry = MockPackageRegistry::new();
        fetcher(registry, store.clone()).invalidate().unwrap();

        assert_eq!(store.get_flag(CATALOG_FLAG).unwrap(), None);
    }
}

/// Reference resolver and cache tests
///
/// Coalescing, expiry, failure recovery and invalidation against a
/// fetcher that counts its calls.
/// Run with: cargo test --test resolver_cache_tests
use async_trait::async_trait;
use schemagrid::{
    CollectionKind, Entity, GridError, OptionsFetcher, ReferenceCache, ReferenceResolver, Result,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct CountingFetcher {
    calls: AtomicUsize,
    /// Calls up to this count fail
    fail_first: usize,
    delay: Duration,
}

impl CountingFetcher {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            delay,
        })
    }

    fn failing_once(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_first: 1,
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OptionsFetcher for CountingFetcher {
    async fn fetch_options(&self, catalog: &str, kind: CollectionKind) -> Result<Vec<Entity>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        if call <= self.fail_first {
            return Err(GridError::FetchFailed {
                catalog: catalog.to_string(),
                kind,
                message: "service unavailable".to_string(),
            });
        }
        Ok(vec![
            Entity::new("vt-1", "Reefer"),
            Entity::new("vt-2", format!("Tautliner #{}", call)),
        ])
    }
}

fn resolver(fetcher: Arc<CountingFetcher>, ttl: Duration) -> ReferenceResolver {
    ReferenceResolver::new(Arc::new(ReferenceCache::new(ttl, 16)), fetcher)
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_resolves_share_one_fetch() {
    let fetcher = CountingFetcher::new(Duration::from_millis(50));
    let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(300));

    let (a, b) = tokio::join!(
        resolver.resolve("vehicle-type", CollectionKind::Catalog),
        resolver.resolve("vehicle-type", CollectionKind::Catalog),
    );

    assert_eq!(a.unwrap().len(), 2);
    assert_eq!(b.unwrap().len(), 2);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(resolver.cache().stats().coalesced, 1);
}

#[tokio::test(start_paused = true)]
async fn test_coalescing_across_tasks() {
    let fetcher = CountingFetcher::new(Duration::from_millis(50));
    let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(300));

    let mut handles = vec![];
    for _ in 0..8 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move {
            resolver.resolve("vehicle-type", CollectionKind::Catalog).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_keys_fetch_independently() {
    let fetcher = CountingFetcher::new(Duration::from_millis(10));
    let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(300));

    let (a, b) = tokio::join!(
        resolver.resolve("vehicle-type", CollectionKind::Catalog),
        resolver.resolve("vehicle-type", CollectionKind::List),
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_refetches_once() {
    let fetcher = CountingFetcher::new(Duration::from_millis(1));
    let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(300));

    resolver.resolve("vehicle-type", CollectionKind::Catalog).await.unwrap();
    resolver.resolve("vehicle-type", CollectionKind::Catalog).await.unwrap();
    assert_eq!(fetcher.calls(), 1);

    tokio::time::advance(Duration::from_secs(301)).await;
    assert_eq!(resolver.title_of("vehicle-type", CollectionKind::Catalog, "vt-1"), "vt-1");

    let (a, b) = tokio::join!(
        resolver.resolve("vehicle-type", CollectionKind::Catalog),
        resolver.resolve("vehicle-type", CollectionKind::Catalog),
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(
        resolver.title_of("vehicle-type", CollectionKind::Catalog, "vt-2"),
        "Tautliner #2"
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_leaves_cache_untouched() {
    let fetcher = CountingFetcher::failing_once(Duration::from_millis(5));
    let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(300));

    let (a, b) = tokio::join!(
        resolver.resolve("vehicle-type", CollectionKind::Catalog),
        resolver.resolve("vehicle-type", CollectionKind::Catalog),
    );
    assert!(matches!(a, Err(GridError::FetchFailed { .. })));
    assert_eq!(a.unwrap_err(), b.unwrap_err());
    assert!(resolver.cache().is_empty());
    assert_eq!(resolver.title_of("vehicle-type", CollectionKind::Catalog, "vt-1"), "vt-1");

    let retried = resolver.resolve("vehicle-type", CollectionKind::Catalog).await.unwrap();
    assert_eq!(retried.len(), 2);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_during_fetch_is_not_undone() {
    let fetcher = CountingFetcher::new(Duration::from_millis(100));
    let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(300));

    let pending = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve("vehicle-type", CollectionKind::Catalog).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(resolver
        .cache()
        .is_pending(&schemagrid::ResolverKey::new("vehicle-type", CollectionKind::Catalog)));

    assert_eq!(resolver.invalidate(Some("vehicle-type"), None), 1);

    // The caller still gets its answer
    assert_eq!(pending.await.unwrap().unwrap().len(), 2);
    assert!(resolver.cache().is_empty());

    resolver.resolve("vehicle-type", CollectionKind::Catalog).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_caller_does_not_waste_fetch() {
    let fetcher = CountingFetcher::new(Duration::from_millis(100));
    let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(300));

    let abandoned = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve("vehicle-type", CollectionKind::Catalog).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    abandoned.abort();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(resolver.title_of("vehicle-type", CollectionKind::Catalog, "vt-1"), "Reefer");

    resolver.resolve("vehicle-type", CollectionKind::Catalog).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_everything() {
    let fetcher = CountingFetcher::new(Duration::from_millis(1));
    let resolver = resolver(Arc::clone(&fetcher), Duration::from_secs(300));

    resolver.resolve("vehicle-type", CollectionKind::Catalog).await.unwrap();
    resolver.resolve("ports", CollectionKind::List).await.unwrap();

    assert_eq!(resolver.invalidate(None, None), 2);
    assert_eq!(resolver.title_of("ports", CollectionKind::List, "vt-1"), "vt-1");
}

#[tokio::test(start_paused = true)]
async fn test_full_cache_still_coalesces_running_fetches() {
    let fetcher = CountingFetcher::new(Duration::from_millis(50));
    let resolver = ReferenceResolver::new(
        Arc::new(ReferenceCache::new(Duration::from_secs(300), 1)),
        Arc::clone(&fetcher) as Arc<dyn OptionsFetcher>,
    );

    let (a, b, again) = tokio::join!(
        resolver.resolve("a", CollectionKind::Catalog),
        resolver.resolve("b", CollectionKind::Catalog),
        resolver.resolve("a", CollectionKind::Catalog),
    );

    assert!(a.is_ok() && b.is_ok() && again.is_ok());
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(resolver.cache().stats().coalesced, 1);
}

//! ISBN metadata lookups with a TTL cache and per-key request coalescing

use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

use crate::{
    config::MetadataConfig,
    error::AppResult,
    models::{
        isbn::{SOURCE_NONE, SOURCE_OFFLINE, SOURCE_UNKNOWN},
        IsbnMetadata,
    },
    normalize::{normalize_isbn_metadata, sanitize_isbn},
    services::metadata_sources::{build_sources, MetadataSource, SourcePayload},
};

type PendingLookup = Shared<BoxFuture<'static, IsbnMetadata>>;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: IsbnMetadata,
    expires_at: Instant,
}

/// Cache and lookup tuning
#[derive(Debug, Clone, Copy)]
pub struct IsbnLookupSettings {
    pub enabled: bool,
    pub ttl: Duration,
    pub source_timeout: Duration,
}

impl From<&MetadataConfig> for IsbnLookupSettings {
    fn from(config: &MetadataConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: config.cache_ttl(),
            source_timeout: config.source_timeout(),
        }
    }
}

struct Inner {
    sources: Vec<Arc<dyn MetadataSource>>,
    settings: IsbnLookupSettings,
    cache: DashMap<String, CacheEntry>,
    in_flight: DashMap<String, PendingLookup>,
}

/// Removes the in-flight marker when the lookup task ends, however it ends
struct InFlightGuard {
    inner: Arc<Inner>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.remove(&self.key);
    }
}

#[derive(Clone)]
pub struct IsbnService {
    inner: Arc<Inner>,
}

impl IsbnService {
    pub fn new(sources: Vec<Arc<dyn MetadataSource>>, settings: IsbnLookupSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                sources,
                settings,
                cache: DashMap::new(),
                in_flight: DashMap::new(),
            }),
        }
    }

    pub fn from_config(config: &MetadataConfig) -> AppResult<Self> {
        Ok(Self::new(build_sources(config)?, config.into()))
    }

    /// Resolve metadata for an ISBN.
    ///
    /// Never fails: unusable input, missing data and source failures all come
    /// back as `found = false` with a source marker.
    pub async fn lookup(&self, raw: &str) -> IsbnMetadata {
        let sanitized = sanitize_isbn(raw);
        let key = match &sanitized {
            Some(isbn) => isbn.clone(),
            None => format!("invalid:{}", raw.trim().to_lowercase()),
        };

        if let Some(hit) = self.inner.cached(&key) {
            tracing::debug!("ISBN cache hit for {}", key);
            return hit;
        }

        let Some(isbn) = sanitized else {
            tracing::debug!("ISBN lookup skipped for unusable input {:?}", raw);
            let result = IsbnMetadata::not_found(raw.trim(), SOURCE_NONE);
            self.inner.store(&key, result.clone());
            return result;
        };

        let pending = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!("Joining in-flight ISBN lookup for {}", key);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // A lookup may have finished between the cache check and here
                if let Some(hit) = self.inner.cached(&key) {
                    return hit;
                }
                let pending = self.spawn_lookup(key.clone(), isbn);
                entry.insert(pending.clone());
                pending
            }
        };

        pending.await
    }

    fn spawn_lookup(&self, key: String, isbn: String) -> PendingLookup {
        let inner = self.inner.clone();
        let fallback_isbn = isbn.clone();

        let handle = tokio::spawn(async move {
            let _guard = InFlightGuard {
                inner: inner.clone(),
                key: key.clone(),
            };
            let result = inner.resolve(&isbn).await;
            inner.store(&key, result.clone());
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("ISBN lookup task for {} failed: {}", fallback_isbn, e);
                    IsbnMetadata::not_found(&fallback_isbn, SOURCE_UNKNOWN)
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Whether any network source is available
    pub fn is_online(&self) -> bool {
        self.inner.settings.enabled && !self.inner.sources.is_empty()
    }

    pub fn cached_entries(&self) -> usize {
        self.inner.cache.len()
    }
}

impl Inner {
    fn cached(&self, key: &str) -> Option<IsbnMetadata> {
        let now = Instant::now();
        if let Some(entry) = self.cache.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        // Lazily evict an expired entry
        self.cache.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    fn store(&self, key: &str, value: IsbnMetadata) {
        self.cache.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.settings.ttl,
            },
        );
    }

    async fn resolve(&self, isbn: &str) -> IsbnMetadata {
        if !self.settings.enabled || self.sources.is_empty() {
            return IsbnMetadata::not_found(isbn, SOURCE_OFFLINE);
        }

        let mut failures = 0;
        for source in &self.sources {
            let outcome = tokio::time::timeout(self.settings.source_timeout, source.fetch(isbn)).await;
            match outcome {
                Ok(Ok(SourcePayload::Found(raw))) => {
                    let metadata = normalize_isbn_metadata(isbn, source.name(), &raw);
                    if metadata.found {
                        tracing::info!("ISBN {} resolved by {}", isbn, source.name());
                        return metadata;
                    }
                    tracing::debug!("Source {} returned an empty record for {}", source.name(), isbn);
                }
                Ok(Ok(SourcePayload::NotFound)) => {
                    tracing::debug!("Source {} has no record for {}", source.name(), isbn);
                }
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!("Source {} failed for {}: {}", source.name(), isbn, e);
                }
                Err(_) => {
                    failures += 1;
                    tracing::warn!(
                        "Source {} timed out after {:?} for {}",
                        source.name(),
                        self.settings.source_timeout,
                        isbn
                    );
                }
            }
        }

        let marker = if failures == self.sources.len() {
            SOURCE_UNKNOWN
        } else {
            SOURCE_NONE
        };
        IsbnMetadata::not_found(isbn, marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, services::metadata_sources::MockMetadataSource};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every ISBN after a delay and counts calls
    struct SlowSource {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl MetadataSource for SlowSource {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn fetch(&self, _isbn: &str) -> AppResult<SourcePayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(SourcePayload::Found(json!({ "title": "Het mysterie", "authors": ["A. Auteur"] })))
        }
    }

    fn settings(ttl: Duration) -> IsbnLookupSettings {
        IsbnLookupSettings {
            enabled: true,
            ttl,
            source_timeout: Duration::from_secs(5),
        }
    }

    fn slow_service(delay: Duration, ttl: Duration) -> (IsbnService, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = SlowSource {
            calls: calls.clone(),
            delay,
        };
        (IsbnService::new(vec![Arc::new(source)], settings(ttl)), calls)
    }

    #[tokio::test]
    async fn test_concurrent_lookups_coalesce_then_hit_cache() {
        let (service, calls) = slow_service(Duration::from_millis(50), Duration::from_secs(300));

        let (a, b) = tokio::join!(
            service.lookup("9781234567890"),
            service.lookup("978-1-234-56789-0")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(a.found);
        assert_eq!(a, b);

        let c = service.lookup("9781234567890").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.title, "Het mysterie");
    }

    #[tokio::test]
    async fn test_different_keys_resolve_independently() {
        let (service, calls) = slow_service(Duration::from_millis(20), Duration::from_secs(300));

        let (a, b) = tokio::join!(service.lookup("9781234567890"), service.lookup("9789876543210"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.isbn, "9781234567890");
        assert_eq!(b.isbn, "9789876543210");
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let (service, calls) = slow_service(Duration::from_millis(1), Duration::ZERO);

        service.lookup("9781234567890").await;
        service.lookup("9781234567890").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_input_never_calls_sources() {
        let mut source = MockMetadataSource::new();
        source.expect_fetch().times(0);
        let service = IsbnService::new(vec![Arc::new(source)], settings(Duration::from_secs(60)));

        let first = service.lookup("abc").await;
        let second = service.lookup("abc").await;
        assert!(!first.found);
        assert_eq!(first.source, SOURCE_NONE);
        assert_eq!(first, second);
        assert_eq!(service.cached_entries(), 1);
    }

    #[tokio::test]
    async fn test_failing_source_falls_through_to_next() {
        let mut broken = MockMetadataSource::new();
        broken.expect_name().return_const("openlibrary");
        broken
            .expect_fetch()
            .times(1)
            .returning(|_| Err(AppError::Metadata("connection refused".to_string())));

        let mut working = MockMetadataSource::new();
        working.expect_name().return_const("googlebooks");
        working.expect_fetch().times(1).returning(|_| {
            Ok(SourcePayload::Found(json!({
                "title": "De reis",
                "publisher": "Querido",
                "pageCount": 180
            })))
        });

        let service = IsbnService::new(
            vec![Arc::new(broken), Arc::new(working)],
            settings(Duration::from_secs(60)),
        );
        let result = service.lookup("9789045112345").await;
        assert!(result.found);
        assert_eq!(result.source, "googlebooks");
        assert_eq!(result.page_count, Some(180));
    }

    #[tokio::test]
    async fn test_first_useful_source_wins() {
        let mut empty = MockMetadataSource::new();
        empty.expect_name().return_const("openlibrary");
        empty
            .expect_fetch()
            .returning(|_| Ok(SourcePayload::Found(json!({ "pageCount": 10 }))));

        let mut first = MockMetadataSource::new();
        first.expect_name().return_const("googlebooks");
        first
            .expect_fetch()
            .returning(|_| Ok(SourcePayload::Found(json!({ "title": "Eerste" }))));

        let mut never = MockMetadataSource::new();
        never.expect_fetch().times(0);

        let service = IsbnService::new(
            vec![Arc::new(empty), Arc::new(first), Arc::new(never)],
            settings(Duration::from_secs(60)),
        );
        assert_eq!(service.lookup("9781234567890").await.title, "Eerste");
    }

    #[tokio::test]
    async fn test_not_found_markers() {
        let mut missing = MockMetadataSource::new();
        missing.expect_name().return_const("openlibrary");
        missing.expect_fetch().returning(|_| Ok(SourcePayload::NotFound));
        let service = IsbnService::new(vec![Arc::new(missing)], settings(Duration::from_secs(60)));
        assert_eq!(service.lookup("9781234567890").await.source, SOURCE_NONE);

        let mut failing = MockMetadataSource::new();
        failing.expect_name().return_const("openlibrary");
        failing
            .expect_fetch()
            .returning(|_| Err(AppError::Metadata("HTTP 500".to_string())));
        let service = IsbnService::new(vec![Arc::new(failing)], settings(Duration::from_secs(60)));
        assert_eq!(service.lookup("9781234567890").await.source, SOURCE_UNKNOWN);

        let offline = IsbnService::new(Vec::new(), settings(Duration::from_secs(60)));
        let result = offline.lookup("9781234567890").await;
        assert!(!result.found);
        assert_eq!(result.source, SOURCE_OFFLINE);
        assert!(!offline.is_online());
    }

    #[tokio::test]
    async fn test_hanging_source_is_bounded_by_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hanging = SlowSource {
            calls: calls.clone(),
            delay: Duration::from_secs(30),
        };
        let service = IsbnService::new(
            vec![Arc::new(hanging)],
            IsbnLookupSettings {
                enabled: true,
                ttl: Duration::from_secs(60),
                source_timeout: Duration::from_millis(30),
            },
        );

        let started = std::time::Instant::now();
        let result = service.lookup("9781234567890").await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!result.found);
        assert_eq!(result.source, SOURCE_UNKNOWN);
    }
}

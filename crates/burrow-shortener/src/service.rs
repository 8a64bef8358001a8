use crate::error::{Result, ShortenerError};
use crate::shortener::Shortener;
use async_trait::async_trait;
use burrow_core::repository::Insertion;
use burrow_core::{
    Identifier, MappingRecord, MatchPolicy, Repository, ShortCode, StorageError, Transcoder,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

/// Tunables for [`ShortenerService`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, TypedBuilder)]
pub struct ShortenerConfig {
    /// How a submitted URL is compared with stored ones before allocating.
    #[builder(default)]
    pub match_policy: MatchPolicy,
}

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository` and handles:
/// - De-duplication of long URLs under the configured [`MatchPolicy`]
/// - Identifier allocation through [`Repository::insert_or_fetch`]
/// - Deriving and persisting the short code of new records
/// - Decoding short codes back to identifiers for lookup
///
/// A short code is only handed out once both the identifier and the code
/// itself have been written by the repository.
#[derive(Debug)]
pub struct ShortenerService<R> {
    repository: Arc<R>,
    transcoder: Transcoder,
    config: ShortenerConfig,
}

impl<R> Clone for ShortenerService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            transcoder: self.transcoder,
            config: self.config,
        }
    }
}

impl<R: Repository> ShortenerService<R> {
    /// Creates a new `ShortenerService` with exact URL matching.
    pub fn new(repository: R) -> Self {
        Self::with_config(repository, ShortenerConfig::default())
    }

    pub fn with_config(repository: R, config: ShortenerConfig) -> Self {
        Self {
            repository: Arc::new(repository),
            transcoder: Transcoder::new(),
            config,
        }
    }

    pub fn config(&self) -> &ShortenerConfig {
        &self.config
    }

    /// Returns the code of a record that already exists.
    ///
    /// A record can lack its code if the writer that created it has not
    /// persisted it yet, or failed to. The code is a function of the
    /// identifier, so it is derived and written here before being returned.
    async fn existing_code(&self, record: MappingRecord) -> Result<ShortCode> {
        if let Some(code) = record.short_code {
            return Ok(code);
        }

        let code = self.transcoder.encode(record.id);
        warn!(
            id = %record.id,
            code = %code,
            "existing record has no short code, persisting derived code"
        );
        self.persist_code(record.id, &code, &record.long_url).await?;
        Ok(code)
    }

    async fn persist_code(&self, id: Identifier, code: &ShortCode, long_url: &str) -> Result<()> {
        self.repository
            .update_short_code(id, code)
            .await
            .map_err(|e| {
                error!(
                    operation = "update_short_code",
                    id = %id,
                    code = %code,
                    long_url,
                    error = %e,
                    "storage failure"
                );
                ShortenerError::Storage(e)
            })
    }
}

#[async_trait]
impl<R: Repository> Shortener for ShortenerService<R> {
    async fn shorten(&self, long_url: &str) -> Result<ShortCode> {
        debug!(long_url, policy = ?self.config.match_policy, "shortening url");

        let matches = self
            .repository
            .find_by_long_url(long_url, self.config.match_policy)
            .await
            .map_err(|e| storage_failure("find_by_long_url", long_url, e))?;

        if let Some(record) = matches.into_iter().next() {
            let code = self.existing_code(record).await?;
            info!(code = %code, long_url, "url already shortened");
            return Err(ShortenerError::Conflict(code));
        }

        let id = match self
            .repository
            .insert_or_fetch(long_url)
            .await
            .map_err(|e| storage_failure("insert_or_fetch", long_url, e))?
        {
            Insertion::Created(id) => id,
            Insertion::Existing(record) => {
                // Another request stored the same URL after our lookup.
                let code = self.existing_code(record).await?;
                info!(code = %code, long_url, "url shortened by a concurrent request");
                return Err(ShortenerError::Conflict(code));
            }
        };

        let code = self.transcoder.encode(id);
        self.persist_code(id, &code, long_url).await?;

        info!(id = %id, code = %code, long_url, "created short url");
        Ok(code)
    }

    async fn resolve(&self, code: &str) -> Result<MappingRecord> {
        let id = self.transcoder.decode(code).map_err(|e| {
            debug!(code, error = %e, "rejected malformed short code");
            ShortenerError::from(e)
        })?;

        let record = self.repository.find_by_id(id).await.map_err(|e| {
            error!(operation = "find_by_id", id = %id, code, error = %e, "storage failure");
            ShortenerError::Storage(e)
        })?;

        match record {
            Some(record) => {
                debug!(id = %id, code, long_url = %record.long_url, "resolved short code");
                Ok(record)
            }
            None => {
                debug!(id = %id, code, "short code not found");
                Err(ShortenerError::NotFound(code.to_string()))
            }
        }
    }
}

fn storage_failure(operation: &'static str, long_url: &str, e: StorageError) -> ShortenerError {
    error!(operation, long_url, error = %e, "storage failure");
    ShortenerError::Storage(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_storage::InMemoryRepository;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn test_service() -> ShortenerService<InMemoryRepository> {
        ShortenerService::new(InMemoryRepository::new())
    }

    /// Wraps the in-memory repository with switchable failures and a call counter.
    ///
    /// `stale_lookup` makes `find_by_long_url` report no matches, as if the
    /// lookup ran just before a concurrent request stored the same URL.
    #[derive(Default)]
    struct FaultyRepository {
        inner: InMemoryRepository,
        calls: AtomicUsize,
        stale_lookup: AtomicBool,
        fail_lookup: AtomicBool,
        fail_insert: AtomicBool,
        fail_update: AtomicBool,
        fail_find_by_id: AtomicBool,
    }

    impl FaultyRepository {
        fn check(&self, flag: &AtomicBool, operation: &str) -> burrow_core::repository::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if flag.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable(format!("{operation} failed")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Repository for FaultyRepository {
        async fn find_by_long_url(
            &self,
            long_url: &str,
            policy: MatchPolicy,
        ) -> burrow_core::repository::Result<Vec<MappingRecord>> {
            self.check(&self.fail_lookup, "find_by_long_url")?;
            if self.stale_lookup.load(Ordering::SeqCst) {
                return Ok(Vec::new());
            }
            self.inner.find_by_long_url(long_url, policy).await
        }

        async fn create_record(&self, long_url: &str) -> burrow_core::repository::Result<Identifier> {
            self.check(&self.fail_insert, "create_record")?;
            self.inner.create_record(long_url).await
        }

        async fn insert_or_fetch(&self, long_url: &str) -> burrow_core::repository::Result<Insertion> {
            self.check(&self.fail_insert, "insert_or_fetch")?;
            self.inner.insert_or_fetch(long_url).await
        }

        async fn update_short_code(
            &self,
            id: Identifier,
            code: &ShortCode,
        ) -> burrow_core::repository::Result<()> {
            self.check(&self.fail_update, "update_short_code")?;
            self.inner.update_short_code(id, code).await
        }

        async fn find_by_id(
            &self,
            id: Identifier,
        ) -> burrow_core::repository::Result<Option<MappingRecord>> {
            self.check(&self.fail_find_by_id, "find_by_id")?;
            self.inner.find_by_id(id).await
        }
    }

    #[tokio::test]
    async fn first_url_gets_code_b() {
        let service = test_service();

        let code = service.shorten("https://example.com/a").await.unwrap();
        assert_eq!(code.as_str(), "b");
    }

    #[tokio::test]
    async fn end_to_end_create_conflict_resolve() {
        let service = test_service();

        let code = service.shorten("https://example.com/a").await.unwrap();

        let err = service.shorten("https://example.com/a").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Conflict(ref existing) if *existing == code));

        let record = service.resolve(code.as_str()).await.unwrap();
        assert_eq!(record.long_url, "https://example.com/a");
        assert_eq!(record.short_code, Some(code));
    }

    #[tokio::test]
    async fn repeated_submissions_never_create_records() {
        let repo = InMemoryRepository::new();
        let service = ShortenerService::new(repo);

        let code = service.shorten("https://example.com").await.unwrap();
        for _ in 0..5 {
            let err = service.shorten("https://example.com").await.unwrap_err();
            assert!(matches!(err, ShortenerError::Conflict(ref c) if *c == code));
        }

        assert_eq!(service.repository.len(), 1);
    }

    #[tokio::test]
    async fn distinct_urls_get_distinct_codes() {
        let service = test_service();

        let first = service.shorten("https://one.example").await.unwrap();
        let second = service.shorten("https://two.example").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(
            service.resolve(second.as_str()).await.unwrap().long_url,
            "https://two.example"
        );
    }

    #[tokio::test]
    async fn resolve_unknown_code_is_not_found() {
        let service = test_service();

        let err = service.resolve("zzz").await.unwrap_err();
        assert!(matches!(err, ShortenerError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_code_never_reaches_storage() {
        let repo = FaultyRepository::default();
        let service = ShortenerService::new(repo);

        for code in ["", "ab-c", "a b", "../etc", "999999999999"] {
            let err = service.resolve(code).await.unwrap_err();
            assert!(
                matches!(err, ShortenerError::InvalidShortCode(_)),
                "{code:?} should be malformed"
            );
        }

        assert_eq!(service.repository.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exact_policy_ignores_longer_urls() {
        let service = test_service();

        service.shorten("https://example.com/a/b").await.unwrap();
        let code = service.shorten("https://example.com/a").await.unwrap();

        assert_eq!(code.as_str(), "c");
    }

    #[tokio::test]
    async fn substring_policy_conflicts_with_containing_url() {
        let config = ShortenerConfig::builder()
            .match_policy(MatchPolicy::Substring)
            .build();
        let service = ShortenerService::with_config(InMemoryRepository::new(), config);

        let long = service.shorten("https://example.com/a/b").await.unwrap();
        let err = service.shorten("https://example.com/a").await.unwrap_err();

        assert!(matches!(err, ShortenerError::Conflict(ref c) if *c == long));
    }

    #[tokio::test]
    async fn lookup_failure_is_storage_error() {
        let repo = FaultyRepository::default();
        repo.fail_lookup.store(true, Ordering::SeqCst);
        let service = ShortenerService::new(repo);

        let err = service.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn allocation_failure_creates_nothing() {
        let repo = FaultyRepository::default();
        repo.fail_insert.store(true, Ordering::SeqCst);
        let service = ShortenerService::new(repo);

        let err = service.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(_)));
        assert!(service.repository.inner.is_empty());
    }

    #[tokio::test]
    async fn failed_code_write_is_not_reported_as_success() {
        let repo = FaultyRepository::default();
        repo.fail_update.store(true, Ordering::SeqCst);
        let service = ShortenerService::new(repo);

        let err = service.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(_)));
    }

    #[tokio::test]
    async fn codeless_record_is_repaired_on_conflict() {
        let repo = FaultyRepository::default();
        repo.fail_update.store(true, Ordering::SeqCst);
        let service = ShortenerService::new(repo);

        service.shorten("https://example.com").await.unwrap_err();
        service.repository.fail_update.store(false, Ordering::SeqCst);

        let err = service.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Conflict(ref c) if c.as_str() == "b"));

        let record = service
            .repository
            .inner
            .find_by_id(Identifier::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.short_code, Some(ShortCode::new_unchecked("b")));
    }

    #[tokio::test]
    async fn lost_insert_race_reports_existing_code() {
        let repo = FaultyRepository::default();
        repo.stale_lookup.store(true, Ordering::SeqCst);
        let service = ShortenerService::new(repo);

        let code = service.shorten("https://example.com").await.unwrap();

        let err = service.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Conflict(ref c) if *c == code));
        assert_eq!(code.as_str(), "b");
        assert_eq!(service.repository.inner.len(), 1);
    }

    #[tokio::test]
    async fn failed_repair_after_lost_insert_race_is_storage_error() {
        let repo = FaultyRepository::default();
        repo.stale_lookup.store(true, Ordering::SeqCst);
        repo.fail_update.store(true, Ordering::SeqCst);
        let service = ShortenerService::new(repo);

        let err = service.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Unavailable(_))));

        // The record exists without a code; the repair write fails too.
        let err = service.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Unavailable(_))));

        let record = service
            .repository
            .inner
            .find_by_id(Identifier::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.short_code, None);
        assert_eq!(service.repository.inner.len(), 1);
    }

    #[tokio::test]
    async fn resolve_storage_failure_is_not_not_found() {
        let repo = FaultyRepository::default();
        let service = ShortenerService::new(repo);
        let code = service.shorten("https://example.com").await.unwrap();

        service.repository.fail_find_by_id.store(true, Ordering::SeqCst);

        let err = service.resolve(code.as_str()).await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_shorten_of_same_url_yields_one_code() {
        let service = test_service();
        let mut handles = vec![];

        for _ in 0..16 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.shorten("https://race.example").await
            }));
        }

        let mut created = vec![];
        let mut conflicts = vec![];
        for handle in handles {
            match handle.await.unwrap() {
                Ok(code) => created.push(code),
                Err(ShortenerError::Conflict(code)) => conflicts.push(code),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(created.len(), 1);
        assert!(conflicts.iter().all(|c| *c == created[0]));
        assert_eq!(service.repository.len(), 1);
    }

    #[test]
    fn service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ShortenerService<InMemoryRepository>>();
    }
}

use crate::error::StorageError;
use crate::identifier::Identifier;
use crate::shortcode::ShortCode;
use crate::transcoder::Transcoder;
use async_trait::async_trait;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored mapping from a storage identifier to a long URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRecord {
    /// Storage-assigned identifier.
    pub id: Identifier,
    /// The original URL that was shortened.
    pub long_url: String,
    /// The code derived from `id`. `None` between creation and the write
    /// that persists it.
    pub short_code: Option<ShortCode>,
}

impl MappingRecord {
    /// The canonical code for this record: the stored one, or the one
    /// derived from `id` if it was never written.
    pub fn canonical_code(&self) -> ShortCode {
        self.short_code
            .clone()
            .unwrap_or_else(|| Transcoder::new().encode(self.id))
    }
}

/// How a submitted long URL is compared with stored ones when looking for an
/// existing mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// The stored URL equals the submitted one.
    #[default]
    Exact,
    /// The stored URL contains the submitted one as a substring.
    ///
    /// Looser than [`MatchPolicy::Exact`]: submitting `https://a.com` will
    /// match an existing `https://a.com/path`.
    Substring,
}

impl MatchPolicy {
    /// Returns `true` if `stored` counts as a match for `submitted`.
    pub fn matches(self, stored: &str, submitted: &str) -> bool {
        match self {
            MatchPolicy::Exact => stored == submitted,
            MatchPolicy::Substring => stored.contains(submitted),
        }
    }
}

/// Outcome of [`Repository::insert_or_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// A new record was created with this identifier. Its short code is not
    /// yet set.
    Created(Identifier),
    /// A record with exactly this long URL already existed.
    Existing(MappingRecord),
}

/// Storage contract consumed by the shortener.
///
/// Backends own identifier assignment: identifiers are unique, never reused
/// and never change once handed out.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Returns every record whose long URL matches `long_url` under `policy`,
    /// ordered by ascending identifier.
    async fn find_by_long_url(
        &self,
        long_url: &str,
        policy: MatchPolicy,
    ) -> Result<Vec<MappingRecord>>;

    /// Creates a record holding only `long_url` and returns its identifier.
    ///
    /// Returns `Err(StorageError::Conflict)` if a record with exactly this
    /// long URL already exists. Unlike [`Repository::insert_or_fetch`], the
    /// existing record is not returned.
    async fn create_record(&self, long_url: &str) -> Result<Identifier>;

    /// Creates a record for `long_url` unless one with exactly that URL
    /// exists, in which case the existing record is returned.
    ///
    /// The check and the insert happen as one step, so concurrent callers
    /// with the same URL observe a single record.
    async fn insert_or_fetch(&self, long_url: &str) -> Result<Insertion>;

    /// Persists the short code of the record named by `id`.
    ///
    /// Returns `Err(StorageError::NotFound)` if there is no such record.
    async fn update_short_code(&self, id: Identifier, code: &ShortCode) -> Result<()>;

    /// Retrieves the record for a given identifier.
    /// Returns `None` if it does not exist.
    async fn find_by_id(&self, id: Identifier) -> Result<Option<MappingRecord>>;
}

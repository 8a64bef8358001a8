use crate::error::Result;
use async_trait::async_trait;
use burrow_core::{MappingRecord, ShortCode};

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Returns a fresh short code for `long_url`.
    ///
    /// If the URL is already mapped, fails with
    /// [`ShortenerError::Conflict`](crate::ShortenerError::Conflict) carrying
    /// the existing code. The URL must already be validated by the caller.
    async fn shorten(&self, long_url: &str) -> Result<ShortCode>;

    /// Retrieves the mapping named by `code`.
    ///
    /// Malformed codes fail with `InvalidShortCode` without touching storage;
    /// well-formed codes without a record fail with `NotFound`.
    async fn resolve(&self, code: &str) -> Result<MappingRecord>;
}

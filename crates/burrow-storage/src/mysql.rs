use async_trait::async_trait;
use burrow_core::error::StorageError;
use burrow_core::repository::{Insertion, MappingRecord, MatchPolicy, Repository, Result};
use burrow_core::{Identifier, ShortCode};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySqlPool, Row};
use std::time::Duration;
use tracing::debug;

/// Schema for the `short_urls` table. Safe to apply repeatedly.
pub const SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");

const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// MySQL implementation of the repository contract.
///
/// Identifiers come from the `AUTO_INCREMENT` primary key. Long URLs are
/// unique through a stored SHA-256 column, which is what makes
/// [`Repository::insert_or_fetch`] atomic: the insert either wins or hits
/// the unique index, and the loser reads back the winner's row.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool and makes sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        let repository = Self::new(pool);
        repository.ensure_schema().await?;
        Ok(repository)
    }

    /// Creates the `short_urls` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn insert(&self, long_url: &str) -> std::result::Result<Identifier, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (long_url)
            VALUES (?)
            "#,
        )
        .bind(long_url)
        .execute(&self.pool)
        .await?;

        Ok(Identifier::new(result.last_insert_id()))
    }

    async fn find_exact(&self, long_url: &str) -> Result<Option<MappingRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, long_url, short_code
            FROM short_urls
            WHERE long_url_hash = UNHEX(SHA2(?, 256))
              AND long_url = ?
            LIMIT 1
            "#,
        )
        .bind(long_url)
        .bind(long_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(parse_record).transpose()
    }
}

fn parse_record(row: &MySqlRow) -> Result<MappingRecord> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
    let short_code: Option<String> = row.try_get("short_code").map_err(map_sqlx_error)?;

    Ok(MappingRecord {
        id: Identifier::new(id),
        long_url,
        short_code: short_code.map(ShortCode::new_unchecked),
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn find_by_long_url(
        &self,
        long_url: &str,
        policy: MatchPolicy,
    ) -> Result<Vec<MappingRecord>> {
        match policy {
            MatchPolicy::Exact => Ok(self.find_exact(long_url).await?.into_iter().collect()),
            MatchPolicy::Substring => {
                let rows = sqlx::query(
                    r#"
                    SELECT id, long_url, short_code
                    FROM short_urls
                    WHERE INSTR(CAST(long_url AS BINARY), CAST(? AS BINARY)) > 0
                    ORDER BY id
                    "#,
                )
                .bind(long_url)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

                rows.iter().map(parse_record).collect()
            }
        }
    }

    async fn create_record(&self, long_url: &str) -> Result<Identifier> {
        match self.insert(long_url).await {
            Ok(id) => Ok(id),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(long_url.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn insert_or_fetch(&self, long_url: &str) -> Result<Insertion> {
        match self.insert(long_url).await {
            Ok(id) => Ok(Insertion::Created(id)),
            Err(err) if is_unique_violation(&err) => {
                debug!("long url already stored, fetching existing row");
                let record = self.find_exact(long_url).await?.ok_or_else(|| {
                    StorageError::InvalidData(format!(
                        "unique violation without a matching row: {long_url}"
                    ))
                })?;
                Ok(Insertion::Existing(record))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update_short_code(&self, id: Identifier, code: &ShortCode) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET short_code = ?
            WHERE id = ?
            "#,
        )
        .bind(code.as_str())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        // Zero affected rows is either a missing row or an unchanged value.
        if result.rows_affected() == 0 && self.find_by_id(id).await?.is_none() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: Identifier) -> Result<Option<MappingRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, long_url, short_code
            FROM short_urls
            WHERE id = ?
            LIMIT 1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(parse_record).transpose()
    }
}

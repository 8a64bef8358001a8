use async_trait::async_trait;
use burrow_core::error::StorageError;
use burrow_core::repository::{Insertion, MappingRecord, MatchPolicy, Repository, Result};
use burrow_core::{Identifier, ShortCode};
use dashmap::mapref::entry::Entry as IndexEntry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// In-memory storage entry for a mapping.
#[derive(Debug, Clone)]
struct Entry {
    long_url: String,
    short_code: Option<ShortCode>,
}

impl Entry {
    fn to_record(&self, id: Identifier) -> MappingRecord {
        MappingRecord {
            id,
            long_url: self.long_url.clone(),
            short_code: self.short_code.clone(),
        }
    }
}

/// In-memory implementation of the Repository trait using DashMap.
///
/// Identifiers are handed out by an atomic counter starting at 1, the way an
/// auto-increment column would. A second map indexes the identifier stored
/// for each long URL; its entry API makes [`Repository::insert_or_fetch`]
/// and [`Repository::create_record`] atomic per URL.
#[derive(Debug)]
pub struct InMemoryRepository {
    records: DashMap<Identifier, Entry>,
    by_url: DashMap<String, Identifier>,
    next_id: AtomicU64,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_url: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn allocate(&self, long_url: &str) -> Identifier {
        let id = Identifier::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.insert(
            id,
            Entry {
                long_url: long_url.to_owned(),
                short_code: None,
            },
        );
        id
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_by_long_url(
        &self,
        long_url: &str,
        policy: MatchPolicy,
    ) -> Result<Vec<MappingRecord>> {
        match policy {
            MatchPolicy::Exact => {
                let Some(id) = self.by_url.get(long_url).map(|entry| *entry.value()) else {
                    return Ok(Vec::new());
                };
                Ok(self
                    .records
                    .get(&id)
                    .map(|entry| entry.to_record(id))
                    .into_iter()
                    .collect())
            }
            MatchPolicy::Substring => {
                let mut found: Vec<MappingRecord> = self
                    .records
                    .iter()
                    .filter(|item| policy.matches(&item.value().long_url, long_url))
                    .map(|item| item.value().to_record(*item.key()))
                    .collect();
                found.sort_by_key(|record| record.id);
                Ok(found)
            }
        }
    }

    async fn create_record(&self, long_url: &str) -> Result<Identifier> {
        match self.by_url.entry(long_url.to_owned()) {
            IndexEntry::Occupied(_) => Err(StorageError::Conflict(long_url.to_string())),
            IndexEntry::Vacant(vacant) => {
                let id = self.allocate(long_url);
                vacant.insert(id);
                trace!(id = %id, "created record");
                Ok(id)
            }
        }
    }

    async fn insert_or_fetch(&self, long_url: &str) -> Result<Insertion> {
        // The index shard stays locked until the match arm ends, so a
        // concurrent caller with the same URL waits and then sees our id.
        match self.by_url.entry(long_url.to_owned()) {
            IndexEntry::Occupied(existing) => {
                let id = *existing.get();
                let record = self
                    .records
                    .get(&id)
                    .map(|entry| entry.to_record(id))
                    .ok_or_else(|| {
                        StorageError::InvalidData(format!("url index points at missing record {id}"))
                    })?;
                Ok(Insertion::Existing(record))
            }
            IndexEntry::Vacant(vacant) => {
                let id = self.allocate(long_url);
                vacant.insert(id);
                trace!(id = %id, "created record");
                Ok(Insertion::Created(id))
            }
        }
    }

    async fn update_short_code(&self, id: Identifier, code: &ShortCode) -> Result<()> {
        let Some(mut entry) = self.records.get_mut(&id) else {
            return Err(StorageError::NotFound(id.to_string()));
        };
        entry.short_code = Some(code.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Identifier) -> Result<Option<MappingRecord>> {
        Ok(self.records.get(&id).map(|entry| entry.to_record(id)))
    }
}

//! Storage backends for the Burrow URL shortener.

pub mod memory;
pub mod mysql;

pub use burrow_core::repository::{Insertion, MappingRecord, MatchPolicy, Repository};
pub use burrow_core::StorageError;
pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;

//! Core types and traits for the Burrow URL shortener.
//!
//! This crate provides the identifier/short code transcoder and the storage
//! contract shared by the shortener service and the storage backends.

pub mod error;
pub mod identifier;
pub mod repository;
pub mod shortcode;
pub mod transcoder;

pub use error::{CoreError, StorageError};
pub use identifier::Identifier;
pub use repository::{Insertion, MappingRecord, MatchPolicy, Repository};
pub use shortcode::ShortCode;
pub use transcoder::Transcoder;

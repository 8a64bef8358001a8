//! URL shortener service implementation.
//!
//! This crate provides the create-or-conflict allocation protocol and code
//! resolution on top of a [`burrow_core::Repository`]. Core types are
//! re-exported from `burrow_core`.

pub mod error;
pub mod service;
pub mod shortener;

pub use burrow_core::{Identifier, MappingRecord, MatchPolicy, ShortCode};
pub use error::ShortenerError;
pub use service::{ShortenerConfig, ShortenerService};
pub use shortener::Shortener;

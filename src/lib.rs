//! Box-score Core Library
//!
//! This library fetches box-score pages from a rate-limited public source
//! and turns their embedded HTML tables into normalized tabular records.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Fetch configuration and environment loading
//! - [`db`] - Database connection and schema management (backs the cache)
//! - [`fetch`] - Polite fetch layer: pacing, caching, classification, retry
//! - [`table`] - Table location and row extraction
//! - [`normalize`] - Canonical stat keys and typed values
//! - [`reshape`] - Long to wide pivots and back
//! - [`features`] - Per-game modeling table
//! - [`index`] - Game index input
//! - [`output`] - CSV sinks
//! - [`batch`] - Sequential batch runner with per-game outcomes
//!
//! Control flow for one game: fetch → locate → extract → normalize → reshape.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod config;
pub mod db;
pub mod features;
pub mod fetch;
pub mod index;
pub mod normalize;
pub mod output;
pub mod reshape;
pub mod table;

// Re-export commonly used types
pub use batch::{BatchOptions, BatchReport, BatchRunner, GameOutcome};
pub use config::{ConfigError, FetchConfig, RateLimitPolicy};
pub use db::{Database, DbError};
pub use features::{FeatureRecord, build_features};
pub use fetch::{FetchError, FetchOutcome, Fetched, Fetcher, HttpCache, RateGate, RetryPolicy};
pub use index::{GameEntry, IndexError, read_index};
pub use normalize::{NormalizedStatRow, StatKey, TidyRecord, TypedValue, ValueShape, normalize};
pub use output::OutputError;
pub use reshape::{LinescoreRecord, WideRecord, linescores_to_wide, to_long, to_wide};
pub use table::{LineScore, RawStatRow, Side, TableGrid, TableIdentity, locate};

//! # In-memory storage backend
//!
//! [`MemDb`] implements the [`strata_storage::Database`] contract over an
//! ordered in-memory map. Intended for tests and deterministic simulation;
//! the RocksDB backend is the production counterpart.

#![warn(missing_docs)]

mod storage;

pub use storage::MemDb;

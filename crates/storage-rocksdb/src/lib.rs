//! # RocksDB storage backend
//!
//! Production implementation of the [`strata_storage::Database`] contract.
//! All operations are synchronous blocking I/O; callers in async contexts
//! should use `spawn_blocking` to avoid blocking the runtime.

#![warn(missing_docs)]

mod storage;

pub use storage::{RocksDb, RocksDbConfig};

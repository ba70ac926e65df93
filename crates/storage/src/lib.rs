//! Layered, versioned, merkle-ized key-value storage.
//!
//! This crate is the state layer of a replicated state machine. It holds
//! many independent named sub-stores under one commit root, exposes cheap
//! transactional overlays so speculative execution can be committed or
//! discarded atomically, and produces a deterministic cryptographic
//! commitment per version.
//!
//! # Architecture
//!
//! - [`KvStore`] is the ordered key-value contract every store implements;
//!   [`CommitKvStore`] adds version commitment.
//! - [`CacheKv`] buffers reads, writes and deletes over any parent store and
//!   flushes or discards them as a unit; range reads merge the dirty set with
//!   the parent through [`MergeIterator`].
//! - [`RootMultiStore`] owns the mounted sub-stores, drives version load and
//!   commit, persists per-version [`strata_types::CommitInfo`] records, and
//!   routes queries; [`CacheMultiStore`] is its speculative overlay.
//! - [`Database`] abstracts the backing engine; backends live in the
//!   `strata-storage-memory` and `strata-storage-rocksdb` crates.
//!
//! Serialization of persisted metadata goes through an injected [`Codec`]
//! ([`SborCodec`] by default), and the top-level root hash is the
//! deterministic merkle-from-map of `strata-types`.

#![warn(missing_docs)]

mod cache;
mod cache_multi;
mod codec;
mod db;
mod error;
pub mod keys;
mod merge;
mod multi;
pub mod query;
mod substores;
mod traits;

pub use cache::CacheKv;
pub use cache_multi::CacheMultiStore;
pub use codec::{Codec, CodecError, SborCodec};
pub use db::{BatchOp, Database, DbError, PrefixDb, WriteBatch};
pub use error::StoreError;
pub use merge::{Direction, MergeIterator, OverlayItem};
pub use multi::{commit_info_hash, multistore_proof_op, RootMultiStore, StoreKey, StoreKind};
pub use query::{QueryRequest, QueryResponse};
pub use substores::{MerkleStore, PlainStore, TransientStore};
pub use traits::{CommitKvStore, KvStore, PruningPolicy, Queryable};

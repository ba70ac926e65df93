//! Error types for the storage layer.

use crate::codec::CodecError;
use crate::db::DbError;
use strata_types::Hash;
use thiserror::Error;

/// Errors surfaced by stores and the root multi-store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An empty key was passed to a store. Precondition violation: always a
    /// caller bug, but reported instead of unwinding the process.
    #[error("invalid key: keys must be non-empty")]
    InvalidKey,

    /// A store key or store name was mounted twice.
    #[error("store {name:?} is already mounted")]
    MountConflict {
        /// The conflicting store name.
        name: String,
    },

    /// No commit info was persisted for the requested version.
    #[error("no commit info found for version {version}")]
    MissingCommitInfo {
        /// The requested version.
        version: u64,
    },

    /// Commit info was present but failed to decode.
    #[error("commit info for version {version} is corrupt: {reason}")]
    CorruptCommitInfo {
        /// The requested version.
        version: u64,
        /// Decoder failure detail.
        reason: String,
    },

    /// A persisted commit record names a store that is not mounted.
    #[error("commit info references unmounted store {0:?}")]
    UnknownStore(String),

    /// A loaded store's recomputed state hash does not match the commit
    /// record it was loaded against.
    #[error("commit hash mismatch: expected {expected}, computed {computed}")]
    CommitHashMismatch {
        /// Hash recorded in the commit info.
        expected: Hash,
        /// Hash recomputed from the persisted state.
        computed: Hash,
    },

    /// A sub-store failed to load; the multi-store's state was not mutated.
    #[error("failed to load store {name:?}: {source}")]
    SubStoreLoad {
        /// Name of the failing sub-store.
        name: String,
        /// The underlying failure.
        source: Box<StoreError>,
    },

    /// Backing database failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Serialization failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

//! Commit metadata: the per-version record of sub-store commits.
//!
//! A [`CommitId`] identifies one committed state of a store. The root
//! multi-store persists a [`CommitInfo`] per version, listing the commit id
//! of every sub-store that participates in the top-level root hash.

use crate::Hash;
use sbor::prelude::*;

/// Identifies a committed state: a version number and the state hash at that
/// version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub struct CommitId {
    /// Monotonically increasing version, starting at 1 for the first commit.
    pub version: u64,
    /// State hash at this version.
    pub hash: Hash,
}

impl CommitId {
    /// The zero commit id: version 0 with an empty hash.
    ///
    /// Stores return this from `commit()` to opt out of the top-level root
    /// (e.g. transient stores).
    pub fn zero() -> Self {
        Self {
            version: 0,
            hash: Hash::ZERO,
        }
    }

    /// True iff this is the zero commit id.
    pub fn is_zero(&self) -> bool {
        self.version == 0 && self.hash.is_zero()
    }
}

impl Default for CommitId {
    fn default() -> Self {
        Self::zero()
    }
}

/// The consensus-relevant core of a store's per-version record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub struct StoreCore {
    /// The store's commit id at this version.
    pub commit_id: CommitId,
}

/// Name and core of one sub-store; a leaf of the top-level merkle tree.
///
/// The name is not hashed into the leaf itself: it enters the root only as
/// the key of the merkle-ized map.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct StoreInfo {
    /// Sub-store name, unique within one multi-store.
    pub name: String,
    /// The sub-store's commit record.
    pub core: StoreCore,
}

/// Per-version commit record of the root multi-store.
///
/// Immutable once created; persisted verbatim under the version it describes.
/// `store_infos` is kept sorted by name so the serialized form is a pure
/// function of the store set.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct CommitInfo {
    /// The multi-store version this record describes.
    pub version: u64,
    /// Commit ids of all sub-stores with a non-zero commit, sorted by name.
    pub store_infos: Vec<StoreInfo>,
}

impl CommitInfo {
    /// Look up the record for a named sub-store.
    pub fn store_info(&self, name: &str) -> Option<&StoreInfo> {
        self.store_infos.iter().find(|si| si.name == name)
    }
}

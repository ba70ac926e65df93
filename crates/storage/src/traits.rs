//! Store traits shared across the storage layer.
//!
//! [`KvStore`] is the ordered key-value contract every store implements.
//! [`CommitKvStore`] extends it with version commitment, and is what the root
//! multi-store mounts. All methods take `&self`; implementations use interior
//! mutability so stores can be layered and shared.

use crate::error::StoreError;
use crate::query::{QueryRequest, QueryResponse};
use strata_types::CommitId;

/// Ordered key-value store.
///
/// Keys are opaque, non-empty byte strings; iteration is byte-lexicographic
/// over the half-open range `[start, end)`, with `None` meaning unbounded.
pub trait KvStore: Send + Sync {
    /// Get the value for a key, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Check whether a key exists. Defined as `get(key).is_some()`; stores
    /// may override with a cheaper check.
    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Set a key to a value.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key. Deleting an absent key is a no-op.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Iterate `[start, end)` in ascending byte order.
    fn iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;

    /// Iterate `[start, end)` in descending byte order.
    fn rev_iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;
}

/// A key-value store that can commit its state to a versioned hash.
pub trait CommitKvStore: KvStore {
    /// Commit the current state, advancing the store's version.
    ///
    /// Returns the new commit id. A store may return [`CommitId::zero`] to
    /// opt out of the multi-store root hash (e.g. transient stores).
    fn commit(&self) -> Result<CommitId, StoreError>;

    /// The id of the most recent commit (zero before the first).
    fn last_commit_id(&self) -> CommitId;

    /// Record the pruning policy for this store's version retention.
    fn set_pruning(&self, policy: PruningPolicy);

    /// View this store as a plain [`KvStore`].
    ///
    /// Needed because `dyn CommitKvStore` cannot be coerced to `dyn KvStore`
    /// through the supertrait.
    fn as_kv(&self) -> &dyn KvStore;

    /// The query capability, if this store supports routed queries.
    fn as_queryable(&self) -> Option<&dyn Queryable> {
        None
    }
}

/// A store that answers routed queries.
pub trait Queryable {
    /// Answer a query. Errors are reported as structured responses, never as
    /// panics or `Err` returns.
    fn query(&self, req: QueryRequest) -> QueryResponse;
}

/// Version retention policy, propagated to every mounted sub-store.
///
/// The policy is configuration only: retention itself is enforced by the
/// individual store implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PruningPolicy {
    /// Keep every version.
    #[default]
    KeepAll,
    /// Keep the most recent `n` versions.
    KeepRecent(u64),
    /// Keep only the latest version.
    KeepNone,
}

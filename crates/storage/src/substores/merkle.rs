//! Authenticated sub-store with a merkle commitment over its contents.
//!
//! [`MerkleStore`] keeps its entries as an ordered in-memory map mirrored
//! into its database view at commit time. Each `commit()` advances the
//! store's version and recomputes the state root as the deterministic merkle
//! root over `{key -> blake3(value)}`. Loading verifies the recomputed root
//! against the commit id recorded by the multi-store, so silent corruption of
//! the persisted entries is caught at startup.
//!
//! Queries are served from the last *committed* state so that returned
//! values and proofs always match the store's reported version, even while
//! uncommitted writes are pending.

use crate::db::{Database, WriteBatch};
use crate::error::StoreError;
use crate::query::{
    Proof, ProofOp, QueryRequest, QueryResponse, CODE_UNSUPPORTED_QUERY, PROOF_OP_STORE_KEY,
};
use crate::traits::{CommitKvStore, KvStore, PruningPolicy, Queryable};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex};
use strata_types::{merkle, CommitId, Hash};

/// All mutable state behind one lock, so version, root and entries can never
/// be observed out of sync.
struct Inner {
    /// Current working entries, including uncommitted writes.
    working: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Entries as of the last commit; what queries and proofs are served from.
    committed: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Writes since the last commit: `None` marks a deletion.
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    last_commit: CommitId,
}

/// An authenticated key-value store.
pub struct MerkleStore {
    db: Arc<dyn Database>,
    inner: Mutex<Inner>,
    pruning: Mutex<PruningPolicy>,
}

impl std::fmt::Debug for MerkleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerkleStore").finish_non_exhaustive()
    }
}

impl MerkleStore {
    /// Load the store from its database view, verifying the persisted
    /// entries against `expected`.
    ///
    /// A zero `expected` means the store has never committed: the view must
    /// hash to the empty root.
    pub fn load(db: Arc<dyn Database>, expected: CommitId) -> Result<Self, StoreError> {
        let mut entries = BTreeMap::new();
        for (key, value) in db.iter(None, None) {
            entries.insert(key, value);
        }

        let computed = state_root(&entries);
        let expected_root = if expected.is_zero() {
            Hash::ZERO
        } else {
            expected.hash
        };
        if computed != expected_root {
            return Err(StoreError::CommitHashMismatch {
                expected: expected_root,
                computed,
            });
        }

        Ok(Self {
            db,
            inner: Mutex::new(Inner {
                committed: entries.clone(),
                working: entries,
                pending: BTreeMap::new(),
                last_commit: expected,
            }),
            pruning: Mutex::new(PruningPolicy::default()),
        })
    }

    fn collect_range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        let inner = self.inner.lock().expect("merkle store mutex poisoned");
        let lo = start.map_or(Bound::Unbounded, Bound::Included);
        let hi = end.map_or(Bound::Unbounded, Bound::Excluded);
        let mut items: Vec<_> = inner
            .working
            .range::<[u8], _>((lo, hi))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if reverse {
            items.reverse();
        }
        items
    }
}

impl KvStore for MerkleStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.lock().expect("merkle store mutex poisoned");
        Ok(inner.working.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("merkle store mutex poisoned");
        inner.working.insert(key.to_vec(), value.to_vec());
        inner.pending.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("merkle store mutex poisoned");
        inner.working.remove(key);
        inner.pending.insert(key.to_vec(), None);
        Ok(())
    }

    fn iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        Box::new(self.collect_range(start, end, false).into_iter())
    }

    fn rev_iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        Box::new(self.collect_range(start, end, true).into_iter())
    }
}

impl CommitKvStore for MerkleStore {
    fn commit(&self) -> Result<CommitId, StoreError> {
        let mut inner = self.inner.lock().expect("merkle store mutex poisoned");

        // Persist the pending writes atomically before advancing the version,
        // so a crash mid-commit leaves the previous version intact on disk.
        let mut batch = WriteBatch::new();
        for (key, change) in &inner.pending {
            match change {
                Some(value) => batch.set(key.clone(), value.clone()),
                None => batch.delete(key.clone()),
            }
        }
        if !batch.is_empty() {
            self.db.write_batch(batch)?;
        }

        let root = state_root(&inner.working);
        let version = inner.last_commit.version + 1;
        let committed = inner.working.clone();
        inner.last_commit = CommitId {
            version,
            hash: root,
        };
        inner.committed = committed;
        inner.pending.clear();

        tracing::debug!(version, root = %root, "committed merkle store");
        Ok(inner.last_commit)
    }

    fn last_commit_id(&self) -> CommitId {
        self.inner
            .lock()
            .expect("merkle store mutex poisoned")
            .last_commit
    }

    fn set_pruning(&self, policy: PruningPolicy) {
        *self.pruning.lock().expect("pruning mutex poisoned") = policy;
    }

    fn as_kv(&self) -> &dyn KvStore {
        self
    }

    fn as_queryable(&self) -> Option<&dyn Queryable> {
        Some(self)
    }
}

impl Queryable for MerkleStore {
    fn query(&self, req: QueryRequest) -> QueryResponse {
        match req.path.as_str() {
            "/key" => {
                let inner = self.inner.lock().expect("merkle store mutex poisoned");
                let value = inner.committed.get(&req.data).cloned().unwrap_or_default();

                let proof = if req.prove && inner.committed.contains_key(&req.data) {
                    let map = hashed_entries(&inner.committed);
                    merkle::proof_from_map(&map, &req.data).map(|p| Proof {
                        ops: vec![ProofOp {
                            op_type: PROOF_OP_STORE_KEY.to_string(),
                            key: req.data.clone(),
                            data: p.encode(),
                        }],
                    })
                } else {
                    None
                };

                QueryResponse {
                    key: req.data,
                    value,
                    height: inner.last_commit.version,
                    proof,
                    ..QueryResponse::default()
                }
            }
            path => QueryResponse::error(
                CODE_UNSUPPORTED_QUERY,
                format!("unexpected query path: {path:?}"),
            ),
        }
    }
}

fn hashed_entries(entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> BTreeMap<Vec<u8>, Hash> {
    entries
        .iter()
        .map(|(k, v)| (k.clone(), Hash::from_bytes(v)))
        .collect()
}

fn state_root(entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> Hash {
    merkle::root_from_map(&hashed_entries(entries))
}

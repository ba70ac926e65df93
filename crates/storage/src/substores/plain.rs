//! Pass-through store over a database view.
//!
//! A plain store persists immediately and keeps no in-memory state of its
//! own: every operation goes straight to the underlying view. It has no
//! cryptographic commitment, so `commit()` returns the zero commit id and
//! the store never appears in the top-level root hash.

use crate::db::Database;
use crate::error::StoreError;
use crate::traits::{CommitKvStore, KvStore, PruningPolicy};
use std::sync::Arc;
use strata_types::CommitId;

/// A disk-backed store without versioning or commitment.
pub struct PlainStore {
    db: Arc<dyn Database>,
}

impl PlainStore {
    /// Wrap a database view.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

impl KvStore for PlainStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        Ok(self.db.set(key, value)?)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        Ok(self.db.delete(key)?)
    }

    fn iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        self.db.iter(start, end)
    }

    fn rev_iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        self.db.rev_iter(start, end)
    }
}

impl CommitKvStore for PlainStore {
    fn commit(&self) -> Result<CommitId, StoreError> {
        Ok(CommitId::zero())
    }

    fn last_commit_id(&self) -> CommitId {
        CommitId::zero()
    }

    fn set_pruning(&self, _policy: PruningPolicy) {}

    fn as_kv(&self) -> &dyn KvStore {
        self
    }
}

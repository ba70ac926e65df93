//! In-memory store wiped at every commit.
//!
//! Transient stores hold per-version scratch state that must not outlive the
//! version it was written in. They opt out of the top-level root hash by
//! committing to the zero commit id.

use crate::error::StoreError;
use crate::traits::{CommitKvStore, KvStore, PruningPolicy};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;
use strata_types::CommitId;

/// An ordered in-memory store cleared on commit.
#[derive(Default)]
pub struct TransientStore {
    entries: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl TransientStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        let entries = self.entries.lock().expect("transient mutex poisoned");
        let lo = start.map_or(Bound::Unbounded, Bound::Included);
        let hi = end.map_or(Bound::Unbounded, Bound::Excluded);
        let mut items: Vec<_> = entries
            .range::<[u8], _>((lo, hi))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if reverse {
            items.reverse();
        }
        items
    }
}

impl KvStore for TransientStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.entries.lock().expect("transient mutex poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("transient mutex poisoned");
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("transient mutex poisoned");
        entries.remove(key);
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

impl CommitKvStore for TransientStore {
    fn commit(&self) -> Result<CommitId, StoreError> {
        let mut entries = self.entries.lock().expect("transient mutex poisoned");
        entries.clear();
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

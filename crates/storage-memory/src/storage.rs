//! In-memory database implementation.
//!
//! Uses `im::OrdMap`, which keeps keys in byte order (matching the iteration
//! contract) and clones in O(1) via structural sharing, so consistent range
//! snapshots are cheap regardless of data size.

use im::OrdMap;
use std::ops::Bound;
use std::sync::RwLock;
use strata_storage::{BatchOp, Database, DbError, WriteBatch};

/// In-memory [`Database`] for tests and simulation.
#[derive(Default)]
pub struct MemDb {
    data: RwLock<OrdMap<Vec<u8>, Vec<u8>>>,
}

impl MemDb {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// True if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().unwrap().is_empty()
    }

    /// Collect a range snapshot under the read lock.
    fn collect_range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        let data = self.data.read().unwrap();
        let lo = start.map_or(Bound::Unbounded, Bound::Included);
        let hi = end.map_or(Bound::Unbounded, Bound::Excluded);
        data.range::<_, [u8]>((lo, hi))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Database for MemDb {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DbError> {
        Ok(self.data.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), DbError> {
        self.data
            .write()
            .unwrap()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), DbError> {
        self.data.write().unwrap().remove(key);
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), DbError> {
        // Apply to a structurally-shared clone, then swap under the write
        // lock, so readers never observe a half-applied batch.
        let mut data = self.data.write().unwrap();
        let mut next = data.clone();
        for op in batch.into_ops() {
            match op {
                BatchOp::Set(key, value) => {
                    next.insert(key, value);
                }
                BatchOp::Delete(key) => {
                    next.remove(&key);
                }
            }
        }
        *data = next;
        Ok(())
    }

    fn iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        Box::new(self.collect_range(start, end).into_iter())
    }

    fn rev_iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let mut items = self.collect_range(start, end);
        items.reverse();
        Box::new(items.into_iter())
    }
}

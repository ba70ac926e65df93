//! Write-buffering cache overlay over a parent store.
//!
//! [`CacheKv`] absorbs reads, writes and deletes in an in-memory map and only
//! touches the parent on read-through misses and on [`CacheKv::write`]. It is
//! the unit of speculative execution: mutate the overlay, then either flush
//! it into the parent or drop it to discard everything.
//!
//! Every operation serializes on a single mutex held for the whole operation
//! body. Iterators snapshot the dirty set at creation time, so later
//! mutations do not affect an iterator already handed out.

use crate::error::StoreError;
use crate::merge::{Direction, MergeIterator, OverlayItem};
use crate::traits::KvStore;
use std::collections::HashMap;
use std::sync::Mutex;

/// One overlay entry.
///
/// - `dirty == false`: a read-through snapshot of the parent; `value == None`
///   records a confirmed absence (negative cache entry).
/// - `dirty == true, deleted == false`: a pending write of `value`.
/// - `dirty == true, deleted == true`: a pending tombstone.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<Vec<u8>>,
    deleted: bool,
    dirty: bool,
}

/// A cache overlay wrapping a parent [`KvStore`].
///
/// The parent may itself be another overlay; stacking depth is unbounded.
pub struct CacheKv<'a> {
    parent: &'a dyn KvStore,
    entries: Mutex<HashMap<Vec<u8>, CacheEntry>>,
}

impl<'a> CacheKv<'a> {
    /// Create an empty overlay over `parent`.
    pub fn new(parent: &'a dyn KvStore) -> Self {
        Self {
            parent,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stack a fresh overlay on top of this one.
    pub fn cache_wrap(&self) -> CacheKv<'_> {
        CacheKv::new(self)
    }

    /// Flush all dirty entries into the parent and clear the overlay.
    ///
    /// Entries are applied in ascending byte order so the parent sees a
    /// deterministic mutation sequence regardless of map iteration order.
    pub fn write(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");

        let mut dirty_keys: Vec<&Vec<u8>> = entries
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(key, _)| key)
            .collect();
        dirty_keys.sort();
        tracing::trace!(dirty = dirty_keys.len(), "flushing overlay to parent");

        for key in dirty_keys {
            let entry = &entries[key];
            if entry.deleted {
                self.parent.delete(key)?;
            } else if let Some(value) = &entry.value {
                self.parent.set(key, value)?;
            }
            // A dirty entry with no value and no tombstone cannot arise, but
            // is skipped rather than trusted.
        }

        entries.clear();
        Ok(())
    }

    /// Snapshot the dirty entries falling in `[start, end)`, ordered in
    /// `direction`. Tombstones are carried as `None`.
    fn dirty_snapshot(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        direction: Direction,
    ) -> Vec<OverlayItem> {
        let entries = self.entries.lock().expect("cache mutex poisoned");

        let mut items: Vec<OverlayItem> = entries
            .iter()
            .filter(|(key, entry)| entry.dirty && in_range(key, start, end))
            .map(|(key, entry)| {
                let value = if entry.deleted {
                    None
                } else {
                    entry.value.clone()
                };
                (key.clone(), value)
            })
            .collect();

        match direction {
            Direction::Forward => items.sort_by(|a, b| a.0.cmp(&b.0)),
            Direction::Reverse => items.sort_by(|a, b| b.0.cmp(&a.0)),
        }

        items
    }

    fn merge_iter(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        direction: Direction,
    ) -> MergeIterator<'a> {
        let parent = match direction {
            Direction::Forward => self.parent.iter(start, end),
            Direction::Reverse => self.parent.rev_iter(start, end),
        };
        MergeIterator::new(parent, self.dirty_snapshot(start, end, direction), direction)
    }
}

impl KvStore for CacheKv<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        check_key(key)?;
        let mut entries = self.entries.lock().expect("cache mutex poisoned");

        if let Some(entry) = entries.get(key) {
            if entry.deleted {
                return Ok(None);
            }
            return Ok(entry.value.clone());
        }

        // Miss: read through and remember the answer, including absence.
        let value = self.parent.get(key)?;
        entries.insert(
            key.to_vec(),
            CacheEntry {
                value: value.clone(),
                deleted: false,
                dirty: false,
            },
        );
        Ok(value)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        check_key(key)?;
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key.to_vec(),
            CacheEntry {
                value: Some(value.to_vec()),
                deleted: false,
                dirty: true,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        check_key(key)?;
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key.to_vec(),
            CacheEntry {
                value: None,
                deleted: true,
                dirty: true,
            },
        );
        Ok(())
    }

    fn iter<'b>(
        &'b self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'b> {
        Box::new(self.merge_iter(start, end, Direction::Forward))
    }

    fn rev_iter<'b>(
        &'b self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'b> {
        Box::new(self.merge_iter(start, end, Direction::Reverse))
    }
}

fn check_key(key: &[u8]) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey);
    }
    Ok(())
}

fn in_range(key: &[u8], start: Option<&[u8]>, end: Option<&[u8]>) -> bool {
    start.is_none_or(|s| key >= s) && end.is_none_or(|e| key < e)
}

//! Backing database abstraction.
//!
//! [`Database`] is the contract the root multi-store and the disk-backed
//! sub-stores run against. Backends implement it over their native engine
//! (in-memory ordered map, RocksDB); [`PrefixDb`] layers a key-prefixed view
//! over any backend so several stores can share one database without key
//! collisions.

use crate::keys::next_prefix;
use std::sync::Arc;
use thiserror::Error;

/// Backend database failure.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database error reported by the backend.
    #[error("database error: {0}")]
    Backend(String),
}

/// An ordered key-value database with atomic batch writes.
///
/// All methods take `&self`; backends use interior mutability or are
/// inherently thread-safe. Iteration is byte-lexicographic over the half-open
/// range `[start, end)`, with `None` meaning unbounded.
pub trait Database: Send + Sync {
    /// Get the value for a key, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DbError>;

    /// Set a key to a value.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), DbError>;

    /// Delete a key. Deleting an absent key is a no-op.
    fn delete(&self, key: &[u8]) -> Result<(), DbError>;

    /// Apply a batch of writes atomically: either every op is visible after
    /// this returns, or (on error) none are.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), DbError>;

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

/// One operation of a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Set a key to a value.
    Set(Vec<u8>, Vec<u8>),
    /// Delete a key.
    Delete(Vec<u8>),
}

/// An ordered list of writes applied atomically by [`Database::write_batch`].
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a set operation.
    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Set(key, value));
    }

    /// Append a delete operation.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete(key));
    }

    /// True if the batch contains no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Consume the batch, yielding its operations in insertion order.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// A key-prefixed view over a shared database.
///
/// Every key is prefixed on the way down and stripped on the way up, so a
/// `PrefixDb` behaves like a private database occupying one contiguous key
/// region of the underlying one.
pub struct PrefixDb {
    inner: Arc<dyn Database>,
    prefix: Vec<u8>,
}

impl PrefixDb {
    /// Wrap `inner` under `prefix`. The prefix must be non-empty.
    pub fn new(inner: Arc<dyn Database>, prefix: &[u8]) -> Self {
        assert!(!prefix.is_empty(), "prefix must be non-empty");
        Self {
            inner,
            prefix: prefix.to_vec(),
        }
    }

    fn prefixed(&self, key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.prefix.len() + key.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(key);
        out
    }

    /// Translate view-relative bounds into absolute bounds on the inner
    /// database. An unbounded end becomes the end of the prefix region.
    fn absolute_bounds(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> (Vec<u8>, Option<Vec<u8>>) {
        let abs_start = self.prefixed(start.unwrap_or(&[]));
        let abs_end = match end {
            Some(end) => Some(self.prefixed(end)),
            None => next_prefix(&self.prefix),
        };
        (abs_start, abs_end)
    }

    fn strip<'a>(
        &'a self,
        iter: Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let prefix = self.prefix.clone();
        Box::new(iter.filter_map(move |(key, value)| {
            key.strip_prefix(prefix.as_slice())
                .map(|stripped| (stripped.to_vec(), value))
        }))
    }
}

impl Database for PrefixDb {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DbError> {
        self.inner.get(&self.prefixed(key))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), DbError> {
        self.inner.set(&self.prefixed(key), value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), DbError> {
        self.inner.delete(&self.prefixed(key))
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), DbError> {
        let mut prefixed = WriteBatch::new();
        for op in batch.into_ops() {
            match op {
                BatchOp::Set(key, value) => prefixed.set(self.prefixed(&key), value),
                BatchOp::Delete(key) => prefixed.delete(self.prefixed(&key)),
            }
        }
        self.inner.write_batch(prefixed)
    }

    fn iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let (abs_start, abs_end) = self.absolute_bounds(start, end);
        self.strip(self.inner.iter(Some(&abs_start), abs_end.as_deref()))
    }

    fn rev_iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let (abs_start, abs_end) = self.absolute_bounds(start, end);
        self.strip(self.inner.rev_iter(Some(&abs_start), abs_end.as_deref()))
    }
}

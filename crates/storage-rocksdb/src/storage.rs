//! RocksDB database implementation.
//!
//! Batches map onto RocksDB's native `WriteBatch`, which is applied
//! atomically; that is what the multi-store's commit-info-plus-latest-pointer
//! invariant rests on.

use rocksdb::{Options, DB};
use std::path::Path;
use strata_storage::{BatchOp, Database, DbError, WriteBatch};

/// Tuning knobs for [`RocksDb::open_with_config`].
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Background compaction/flush jobs.
    pub max_background_jobs: i32,
    /// Memtable size in bytes.
    pub write_buffer_size: usize,
    /// LRU block cache size in bytes, or `None` to use RocksDB's default.
    pub block_cache_size: Option<usize>,
    /// Bloom filter bits per key; 0 disables the filter.
    pub bloom_filter_bits: f64,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            max_background_jobs: 4,
            write_buffer_size: 64 << 20,
            block_cache_size: Some(256 << 20),
            bloom_filter_bits: 10.0,
        }
    }
}

/// RocksDB-backed [`Database`] for production use.
pub struct RocksDb {
    db: DB,
}

impl RocksDb {
    /// Open or create a database at `path` with default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Self::open_with_config(path, RocksDbConfig::default())
    }

    /// Open or create a database at `path`.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: RocksDbConfig,
    ) -> Result<Self, DbError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_max_background_jobs(config.max_background_jobs);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        if let Some(cache_size) = config.block_cache_size {
            let cache = rocksdb::Cache::new_lru_cache(cache_size);
            block_opts.set_block_cache(&cache);
        }
        if config.bloom_filter_bits > 0.0 {
            block_opts.set_bloom_filter(config.bloom_filter_bits, false);
        }
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, path).map_err(backend_err)?;
        Ok(Self { db })
    }
}

impl Database for RocksDb {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DbError> {
        self.db.get(key).map_err(backend_err)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), DbError> {
        self.db.put(key, value).map_err(backend_err)
    }

    fn delete(&self, key: &[u8]) -> Result<(), DbError> {
        self.db.delete(key).map_err(backend_err)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), DbError> {
        let mut native = rocksdb::WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Set(key, value) => native.put(key, value),
                BatchOp::Delete(key) => native.delete(key),
            }
        }
        self.db.write(native).map_err(backend_err)
    }

    fn iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let mut it = self.db.raw_iterator();
        match start {
            Some(start) => it.seek(start),
            None => it.seek_to_first(),
        }
        let end = end.map(|e| e.to_vec());

        Box::new(std::iter::from_fn(move || {
            if !it.valid() {
                return None;
            }
            let key = it.key()?.to_vec();
            if let Some(end) = &end {
                if key.as_slice() >= end.as_slice() {
                    return None;
                }
            }
            let value = it.value()?.to_vec();
            it.next();
            Some((key, value))
        }))
    }

    fn rev_iter<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let mut it = self.db.raw_iterator();
        match end {
            Some(end) => {
                // seek_for_prev lands on the last key <= end; the range end
                // is exclusive, so step off an exact hit.
                it.seek_for_prev(end);
                if it.valid() && it.key() == Some(end) {
                    it.prev();
                }
            }
            None => it.seek_to_last(),
        }
        let start = start.map(|s| s.to_vec());

        Box::new(std::iter::from_fn(move || {
            if !it.valid() {
                return None;
            }
            let key = it.key()?.to_vec();
            if let Some(start) = &start {
                if key.as_slice() < start.as_slice() {
                    return None;
                }
            }
            let value = it.value()?.to_vec();
            it.prev();
            Some((key, value))
        }))
    }
}

fn backend_err(err: rocksdb::Error) -> DbError {
    DbError::Backend(err.to_string())
}

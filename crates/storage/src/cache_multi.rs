//! Cache overlay over a whole multi-store.
//!
//! [`CacheMultiStore`] wraps every loaded sub-store of a [`RootMultiStore`]
//! in its own [`CacheKv`] overlay, sharing the root's name index. Overlays
//! are independent per sub-store; writing the multi-overlay flushes each one
//! into its underlying sub-store, which stays uncommitted until the root's
//! next `commit()`.

use crate::cache::CacheKv;
use crate::error::StoreError;
use crate::multi::{RootMultiStore, StoreKey};
use std::collections::HashMap;

/// One cache overlay per sub-store, indexed by the same store keys.
pub struct CacheMultiStore<'a> {
    stores: HashMap<StoreKey, CacheKv<'a>>,
    keys_by_name: HashMap<String, StoreKey>,
}

impl<'a> CacheMultiStore<'a> {
    pub(crate) fn wrap(root: &'a RootMultiStore) -> Self {
        let stores = root
            .stores
            .iter()
            .map(|(key, store)| (key.clone(), CacheKv::new(store.as_kv())))
            .collect();
        Self {
            stores,
            keys_by_name: root.keys_by_name.clone(),
        }
    }

    /// Get the overlay for a store key.
    pub fn get_kv(&self, key: &StoreKey) -> Option<&CacheKv<'a>> {
        self.stores.get(key)
    }

    /// Get the overlay for a store name.
    pub fn store_by_name(&self, name: &str) -> Option<&CacheKv<'a>> {
        self.stores.get(self.keys_by_name.get(name)?)
    }

    /// Flush every sub-overlay into its underlying sub-store.
    pub fn write(&self) -> Result<(), StoreError> {
        for store in self.stores.values() {
            store.write()?;
        }
        Ok(())
    }

    /// Stack a further multi-overlay on top of this one.
    pub fn cache_wrap(&self) -> CacheMultiStore<'_> {
        let stores = self
            .stores
            .iter()
            .map(|(key, overlay)| (key.clone(), CacheKv::new(overlay)))
            .collect();
        CacheMultiStore {
            stores,
            keys_by_name: self.keys_by_name.clone(),
        }
    }
}

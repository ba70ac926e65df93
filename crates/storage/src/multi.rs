//! The root multi-store: many named commit sub-stores under one commit root.
//!
//! [`RootMultiStore`] owns the mounted sub-stores, drives version load and
//! commit, persists the per-version [`CommitInfo`] record, routes queries by
//! path, and hands out speculative overlays via
//! [`RootMultiStore::cache_wrap`].
//!
//! Per version, the multi-store commits every sub-store, collects the
//! non-zero commit ids into a `CommitInfo`, and writes it together with the
//! latest-version pointer in one atomic batch. The top-level root hash is the
//! deterministic merkle root over `{name -> hash(store_core)}`, so it depends
//! only on the committed contents, never on mount or commit order.

use crate::cache_multi::CacheMultiStore;
use crate::codec::Codec;
use crate::db::{Database, PrefixDb, WriteBatch};
use crate::error::StoreError;
use crate::keys;
use crate::query::{
    parse_path, requires_proof, ProofOp, QueryRequest, QueryResponse, CODE_INTERNAL,
    CODE_INVALID_PATH, CODE_UNKNOWN_STORE, CODE_UNSUPPORTED_QUERY, PROOF_OP_MULTISTORE,
};
use crate::substores::open_store;
use crate::traits::{CommitKvStore, KvStore, PruningPolicy};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strata_types::{merkle, CommitId, CommitInfo, Hash, StoreCore, StoreInfo};

/// The closed set of sub-store kinds the registry can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Authenticated store contributing to the root hash.
    Merkle,
    /// In-memory store wiped at every commit; opts out of the root hash.
    Transient,
    /// Disk-backed pass-through store; opts out of the root hash.
    Plain,
}

/// Handle identifying one mounted sub-store: a unique name plus its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    name: String,
    kind: StoreKind,
}

impl StoreKey {
    /// Create a store key.
    pub fn new(name: impl Into<String>, kind: StoreKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The store's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store's kind.
    pub fn kind(&self) -> StoreKind {
        self.kind
    }
}

/// Mount-time parameters of one sub-store.
struct StoreParams {
    /// Dedicated backing database, or `None` to share the root database
    /// under a derived prefix.
    db: Option<Arc<dyn Database>>,
}

/// Composite store owning many named commit sub-stores.
pub struct RootMultiStore {
    db: Arc<dyn Database>,
    codec: Arc<dyn Codec>,
    pruning: PruningPolicy,
    last_commit_id: CommitId,
    params: HashMap<StoreKey, StoreParams>,
    pub(crate) stores: HashMap<StoreKey, Box<dyn CommitKvStore>>,
    pub(crate) keys_by_name: HashMap<String, StoreKey>,
}

impl RootMultiStore {
    /// Create an empty multi-store over `db`, serializing through `codec`.
    ///
    /// Mount sub-stores with [`mount_store`](Self::mount_store), then load a
    /// version before use.
    pub fn new(db: Arc<dyn Database>, codec: Arc<dyn Codec>) -> Self {
        Self {
            db,
            codec,
            pruning: PruningPolicy::default(),
            last_commit_id: CommitId::zero(),
            params: HashMap::new(),
            stores: HashMap::new(),
            keys_by_name: HashMap::new(),
        }
    }

    /// Mount a sub-store under `key`, optionally with its own backing
    /// database. Takes effect at the next version load.
    ///
    /// Rejects empty names and duplicate keys or names.
    pub fn mount_store(
        &mut self,
        key: StoreKey,
        db: Option<Arc<dyn Database>>,
    ) -> Result<(), StoreError> {
        if key.name().is_empty() {
            return Err(StoreError::InvalidKey);
        }
        if self.params.contains_key(&key) || self.keys_by_name.contains_key(key.name()) {
            return Err(StoreError::MountConflict {
                name: key.name().to_string(),
            });
        }

        self.keys_by_name
            .insert(key.name().to_string(), key.clone());
        self.params.insert(key, StoreParams { db });
        Ok(())
    }

    /// Set the pruning policy, propagating it to every loaded sub-store.
    pub fn set_pruning(&mut self, policy: PruningPolicy) {
        self.pruning = policy;
        for store in self.stores.values() {
            store.set_pruning(policy);
        }
    }

    /// The id of the most recent commit (zero before any).
    pub fn last_commit_id(&self) -> CommitId {
        self.last_commit_id
    }

    /// Load the persisted latest version (0 if none was ever committed).
    pub fn load_latest_version(&mut self) -> Result<(), StoreError> {
        let version = self.latest_version()?;
        self.load_version(version)
    }

    /// Load all mounted sub-stores at `version`.
    ///
    /// On any failure the multi-store's state is left untouched; on success
    /// the freshly loaded store set is swapped in atomically.
    pub fn load_version(&mut self, version: u64) -> Result<(), StoreError> {
        let mut infos: HashMap<String, StoreInfo> = HashMap::new();
        let mut last_commit_id = CommitId::zero();

        if version != 0 {
            let info = self.commit_info_at(version)?;
            last_commit_id = CommitId {
                version: info.version,
                hash: commit_info_hash(self.codec.as_ref(), &info)?,
            };
            for store_info in info.store_infos {
                if !self.keys_by_name.contains_key(&store_info.name) {
                    tracing::warn!(
                        version,
                        store = %store_info.name,
                        "commit info references a store that is not mounted"
                    );
                    return Err(StoreError::UnknownStore(store_info.name));
                }
                infos.insert(store_info.name.clone(), store_info);
            }
        }

        let mut new_stores: HashMap<StoreKey, Box<dyn CommitKvStore>> = HashMap::new();
        for (key, params) in &self.params {
            let expected = infos
                .get(key.name())
                .map(|info| info.core.commit_id)
                .unwrap_or_else(CommitId::zero);
            let view = store_db(&self.db, key, params);
            let store =
                open_store(key.kind(), view, expected, self.pruning).map_err(|source| {
                    tracing::warn!(
                        version,
                        store = %key.name(),
                        error = %source,
                        "sub-store failed to load; multi-store state unchanged"
                    );
                    StoreError::SubStoreLoad {
                        name: key.name().to_string(),
                        source: Box::new(source),
                    }
                })?;
            new_stores.insert(key.clone(), store);
        }

        self.stores = new_stores;
        self.last_commit_id = last_commit_id;
        tracing::debug!(version, stores = self.stores.len(), "loaded multi-store");
        Ok(())
    }

    /// Commit every sub-store, persist the commit info for the new version,
    /// and return the new commit id.
    ///
    /// The commit record and the latest-version pointer are written in a
    /// single atomic batch, so recovery can never observe a latest pointer
    /// without its commit info. A failed batch is fatal to the caller.
    pub fn commit(&mut self) -> Result<CommitId, StoreError> {
        let version = self.last_commit_id.version + 1;

        let mut store_infos = Vec::with_capacity(self.stores.len());
        for (key, store) in &self.stores {
            let commit_id = store.commit()?;
            if commit_id.is_zero() {
                continue;
            }
            store_infos.push(StoreInfo {
                name: key.name().to_string(),
                core: StoreCore { commit_id },
            });
        }
        // Persisted verbatim, so keep the record itself deterministic.
        store_infos.sort_by(|a, b| a.name.cmp(&b.name));

        let info = CommitInfo {
            version,
            store_infos,
        };

        let mut batch = WriteBatch::new();
        batch.set(
            keys::commit_info_key(version),
            self.codec.encode_commit_info(&info)?,
        );
        batch.set(
            keys::LATEST_VERSION_KEY.to_vec(),
            self.codec.encode_version(version)?,
        );
        self.db.write_batch(batch)?;

        let hash = commit_info_hash(self.codec.as_ref(), &info)?;
        self.last_commit_id = CommitId { version, hash };
        tracing::debug!(version, root = %hash, "committed multi-store");
        Ok(self.last_commit_id)
    }

    /// Wrap every loaded sub-store in its own cache overlay for speculative
    /// execution. Writing the returned multi-overlay flushes into the
    /// sub-stores without committing them.
    pub fn cache_wrap(&self) -> CacheMultiStore<'_> {
        CacheMultiStore::wrap(self)
    }

    /// Get a loaded sub-store as a plain key-value store.
    pub fn get_kv(&self, key: &StoreKey) -> Option<&dyn KvStore> {
        self.stores.get(key).map(|store| store.as_kv())
    }

    /// Get a loaded sub-store by name.
    pub fn store_by_name(&self, name: &str) -> Option<&dyn CommitKvStore> {
        let key = self.keys_by_name.get(name)?;
        self.stores.get(key).map(|store| store.as_ref())
    }

    /// Route a query to the sub-store named by its path.
    ///
    /// `req.path` has the shape `/<store_name>[/<rest>]`; the sub-store sees
    /// only `<rest>`. When a proof is requested on a proof-carrying sub-path,
    /// the sub-store's proof is extended with the top-level inclusion proof
    /// of the store name under the multi-store root at the response height.
    pub fn query(&self, req: QueryRequest) -> QueryResponse {
        tracing::debug!(path = %req.path, prove = req.prove, "routing query");

        let Some((store_name, subpath)) = parse_path(&req.path) else {
            tracing::warn!(path = %req.path, "rejecting query with invalid path");
            return QueryResponse::error(
                CODE_INVALID_PATH,
                format!("invalid path: {:?}", req.path),
            );
        };

        let Some(store) = self.store_by_name(store_name) else {
            tracing::warn!(store = %store_name, "query addressed an unmounted store");
            return QueryResponse::error(
                CODE_UNKNOWN_STORE,
                format!("no such store: {store_name}"),
            );
        };

        let Some(queryable) = store.as_queryable() else {
            tracing::warn!(store = %store_name, "query addressed a non-queryable store");
            return QueryResponse::error(
                CODE_UNSUPPORTED_QUERY,
                format!("store {store_name} doesn't support queries"),
            );
        };

        let prove = req.prove;
        let store_name = store_name.to_string();
        let mut res = queryable.query(QueryRequest {
            path: subpath.clone(),
            ..req
        });

        if !prove || !requires_proof(&subpath) {
            return res;
        }

        let info = match self.commit_info_at(res.height) {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(
                    store = %store_name,
                    height = res.height,
                    error = %err,
                    "failed to fetch commit info for proof composition"
                );
                return QueryResponse::error(CODE_INTERNAL, err.to_string());
            }
        };
        match multistore_proof_op(self.codec.as_ref(), &info, &store_name) {
            Ok(Some(op)) => {
                res.proof.get_or_insert_with(Default::default).ops.push(op);
                res
            }
            Ok(None) => {
                tracing::warn!(
                    store = %store_name,
                    height = res.height,
                    "store absent from commit info; cannot compose proof"
                );
                QueryResponse::error(
                    CODE_INTERNAL,
                    format!(
                        "store {store_name} absent from commit info at height {}",
                        res.height
                    ),
                )
            }
            Err(err) => {
                tracing::warn!(store = %store_name, error = %err, "proof composition failed");
                QueryResponse::error(CODE_INTERNAL, err.to_string())
            }
        }
    }

    fn latest_version(&self) -> Result<u64, StoreError> {
        match self.db.get(keys::LATEST_VERSION_KEY)? {
            Some(bytes) => Ok(self.codec.decode_version(&bytes)?),
            None => Ok(0),
        }
    }

    /// Fetch and decode the commit info persisted for `version`.
    fn commit_info_at(&self, version: u64) -> Result<CommitInfo, StoreError> {
        let Some(bytes) = self.db.get(&keys::commit_info_key(version))? else {
            tracing::warn!(version, "no commit info persisted for version");
            return Err(StoreError::MissingCommitInfo { version });
        };
        self.codec.decode_commit_info(&bytes).map_err(|err| {
            tracing::warn!(version, error = %err, "persisted commit info failed to decode");
            StoreError::CorruptCommitInfo {
                version,
                reason: err.to_string(),
            }
        })
    }
}

/// Derive the database view a sub-store runs against.
fn store_db(root_db: &Arc<dyn Database>, key: &StoreKey, params: &StoreParams) -> Arc<dyn Database> {
    match &params.db {
        Some(dedicated) => Arc::new(PrefixDb::new(dedicated.clone(), keys::DEDICATED_DB_PREFIX)),
        None => Arc::new(PrefixDb::new(
            root_db.clone(),
            &keys::shared_store_prefix(key.name()),
        )),
    }
}

/// Build the merkle leaf map of a commit record: store name to the hash of
/// its encoded core. The name enters only through the map key.
fn commit_leaf_map(
    codec: &dyn Codec,
    info: &CommitInfo,
) -> Result<BTreeMap<Vec<u8>, Hash>, StoreError> {
    let mut map = BTreeMap::new();
    for store_info in &info.store_infos {
        let encoded = codec.encode_store_core(&store_info.core)?;
        map.insert(
            store_info.name.as_bytes().to_vec(),
            Hash::from_bytes(&encoded),
        );
    }
    Ok(map)
}

/// The multi-store root hash of a commit record.
pub fn commit_info_hash(codec: &dyn Codec, info: &CommitInfo) -> Result<Hash, StoreError> {
    Ok(merkle::root_from_map(&commit_leaf_map(codec, info)?))
}

/// The top-level inclusion proof op of `store_name` within a commit record,
/// or `None` if the store is absent from it.
pub fn multistore_proof_op(
    codec: &dyn Codec,
    info: &CommitInfo,
    store_name: &str,
) -> Result<Option<ProofOp>, StoreError> {
    let map = commit_leaf_map(codec, info)?;
    Ok(
        merkle::proof_from_map(&map, store_name.as_bytes()).map(|proof| ProofOp {
            op_type: PROOF_OP_MULTISTORE.to_string(),
            key: store_name.as_bytes().to_vec(),
            data: proof.encode(),
        }),
    )
}

//! End-to-end tests of the root multi-store over the in-memory backend.

use std::sync::Arc;
use strata_storage::query::{
    CODE_INVALID_PATH, CODE_UNKNOWN_STORE, CODE_UNSUPPORTED_QUERY, PROOF_OP_MULTISTORE,
    PROOF_OP_STORE_KEY,
};
use strata_storage::{
    keys, Codec, Database, KvStore, PrefixDb, QueryRequest, RootMultiStore, SborCodec, StoreError,
    StoreKey, StoreKind,
};
use strata_storage_memory::MemDb;
use strata_types::{CommitInfo, Hash, MapProof};

fn new_root(db: Arc<MemDb>) -> RootMultiStore {
    RootMultiStore::new(db, Arc::new(SborCodec))
}

fn acc_key() -> StoreKey {
    StoreKey::new("acc", StoreKind::Merkle)
}

fn gov_key() -> StoreKey {
    StoreKey::new("gov", StoreKind::Merkle)
}

/// Read the persisted commit info straight out of the root database.
fn commit_info_at(db: &MemDb, version: u64) -> CommitInfo {
    let bytes = db
        .get(&keys::commit_info_key(version))
        .unwrap()
        .expect("commit info must be persisted");
    SborCodec.decode_commit_info(&bytes).unwrap()
}

#[test]
fn test_fresh_load_has_zero_commit_id() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();
    root.load_latest_version().unwrap();

    assert!(root.last_commit_id().is_zero());
}

#[test]
fn test_mount_conflicts_rejected() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();

    let dup_key = root.mount_store(acc_key(), None).unwrap_err();
    assert!(matches!(dup_key, StoreError::MountConflict { .. }));

    // Same name under a different kind is still a conflict.
    let dup_name = root
        .mount_store(StoreKey::new("acc", StoreKind::Transient), None)
        .unwrap_err();
    assert!(matches!(dup_name, StoreError::MountConflict { .. }));

    let empty = root
        .mount_store(StoreKey::new("", StoreKind::Merkle), None)
        .unwrap_err();
    assert!(matches!(empty, StoreError::InvalidKey));
}

#[test]
fn test_commit_versions_are_gapless() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();
    root.load_latest_version().unwrap();

    for expected in 1..=3u64 {
        let id = root.commit().unwrap();
        assert_eq!(id.version, expected);
        assert_eq!(root.last_commit_id(), id);
    }
}

#[test]
fn test_root_hash_independent_of_mount_order() {
    let write_and_commit = |root: &mut RootMultiStore| {
        root.load_latest_version().unwrap();
        root.get_kv(&acc_key()).unwrap().set(b"k", b"v").unwrap();
        root.get_kv(&gov_key()).unwrap().set(b"p", b"q").unwrap();
        root.commit().unwrap()
    };

    let mut forward = new_root(Arc::new(MemDb::new()));
    forward.mount_store(acc_key(), None).unwrap();
    forward.mount_store(gov_key(), None).unwrap();
    let id_forward = write_and_commit(&mut forward);

    let mut backward = new_root(Arc::new(MemDb::new()));
    backward.mount_store(gov_key(), None).unwrap();
    backward.mount_store(acc_key(), None).unwrap();
    let id_backward = write_and_commit(&mut backward);

    assert_eq!(id_forward, id_backward);
    assert!(!id_forward.hash.is_zero());
}

#[test]
fn test_restart_recovers_committed_state() {
    let db = Arc::new(MemDb::new());

    let committed = {
        let mut root = new_root(db.clone());
        root.mount_store(acc_key(), None).unwrap();
        root.load_latest_version().unwrap();

        let overlay = root.cache_wrap();
        let acc = overlay.store_by_name("acc").unwrap();
        acc.set(b"k", b"v").unwrap();
        overlay.write().unwrap();
        drop(overlay);

        root.commit().unwrap()
    };
    assert_eq!(committed.version, 1);

    // Process restart: a fresh multi-store over the same database.
    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();
    root.load_latest_version().unwrap();

    assert_eq!(root.last_commit_id(), committed);
    let acc = root.get_kv(&acc_key()).unwrap();
    assert_eq!(acc.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_load_missing_version_fails() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();

    let err = root.load_version(7).unwrap_err();
    assert!(matches!(
        err,
        StoreError::MissingCommitInfo { version: 7 }
    ));
}

#[test]
fn test_load_corrupt_commit_info_fails() {
    let db = Arc::new(MemDb::new());
    db.set(keys::LATEST_VERSION_KEY, &SborCodec.encode_version(1).unwrap())
        .unwrap();
    db.set(&keys::commit_info_key(1), b"definitely not sbor")
        .unwrap();

    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();

    let err = root.load_latest_version().unwrap_err();
    assert!(matches!(
        err,
        StoreError::CorruptCommitInfo { version: 1, .. }
    ));
}

#[test]
fn test_failed_load_leaves_state_untouched() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();
    root.load_latest_version().unwrap();
    let id = root.commit().unwrap();

    assert!(root.load_version(9).is_err());
    // The loaded store set and commit id survive the failed load.
    assert_eq!(root.last_commit_id(), id);
    assert!(root.get_kv(&acc_key()).is_some());
}

#[test]
fn test_only_merkle_stores_enter_commit_info() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db.clone());
    root.mount_store(acc_key(), None).unwrap();
    root.mount_store(StoreKey::new("tmp", StoreKind::Transient), None)
        .unwrap();
    root.mount_store(StoreKey::new("idx", StoreKind::Plain), None)
        .unwrap();
    root.load_latest_version().unwrap();

    root.get_kv(&acc_key()).unwrap().set(b"k", b"v").unwrap();
    root.get_kv(&StoreKey::new("tmp", StoreKind::Transient))
        .unwrap()
        .set(b"scratch", b"x")
        .unwrap();
    root.get_kv(&StoreKey::new("idx", StoreKind::Plain))
        .unwrap()
        .set(b"i", b"j")
        .unwrap();

    root.commit().unwrap();

    let info = commit_info_at(&db, 1);
    let names: Vec<_> = info.store_infos.iter().map(|si| si.name.as_str()).collect();
    assert_eq!(names, vec!["acc"]);
}

#[test]
fn test_overlay_discard_and_write_back() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();
    root.load_latest_version().unwrap();

    {
        let discarded = root.cache_wrap();
        discarded
            .store_by_name("acc")
            .unwrap()
            .set(b"k", b"speculative")
            .unwrap();
        // Dropped without write().
    }
    assert_eq!(root.get_kv(&acc_key()).unwrap().get(b"k").unwrap(), None);

    let overlay = root.cache_wrap();
    overlay
        .store_by_name("acc")
        .unwrap()
        .set(b"k", b"kept")
        .unwrap();
    overlay.write().unwrap();
    drop(overlay);

    assert_eq!(
        root.get_kv(&acc_key()).unwrap().get(b"k").unwrap(),
        Some(b"kept".to_vec())
    );
}

#[test]
fn test_nested_multi_overlays() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();
    root.load_latest_version().unwrap();

    let outer = root.cache_wrap();
    outer
        .store_by_name("acc")
        .unwrap()
        .set(b"a", b"1")
        .unwrap();

    let inner = outer.cache_wrap();
    inner
        .store_by_name("acc")
        .unwrap()
        .set(b"b", b"2")
        .unwrap();

    // Inner sees through to the outer overlay; the outer does not see the
    // inner's writes until they are flushed down.
    assert_eq!(
        inner.store_by_name("acc").unwrap().get(b"a").unwrap(),
        Some(b"1".to_vec())
    );
    assert_eq!(outer.store_by_name("acc").unwrap().get(b"b").unwrap(), None);

    inner.write().unwrap();
    assert_eq!(
        outer.store_by_name("acc").unwrap().get(b"b").unwrap(),
        Some(b"2".to_vec())
    );
    outer.write().unwrap();
    drop(inner);
    drop(outer);

    let acc = root.get_kv(&acc_key()).unwrap();
    assert_eq!(acc.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(acc.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_query_path_errors() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db);
    root.mount_store(acc_key(), None).unwrap();
    root.mount_store(StoreKey::new("idx", StoreKind::Plain), None)
        .unwrap();
    root.load_latest_version().unwrap();

    let no_slash = root.query(QueryRequest {
        path: "acc/key".into(),
        data: b"k".to_vec(),
        height: 0,
        prove: false,
    });
    assert_eq!(no_slash.code, CODE_INVALID_PATH);

    let unknown = root.query(QueryRequest {
        path: "/nope/key".into(),
        data: b"k".to_vec(),
        height: 0,
        prove: false,
    });
    assert_eq!(unknown.code, CODE_UNKNOWN_STORE);

    let unsupported = root.query(QueryRequest {
        path: "/idx/key".into(),
        data: b"k".to_vec(),
        height: 0,
        prove: false,
    });
    assert_eq!(unsupported.code, CODE_UNSUPPORTED_QUERY);
}

#[test]
fn test_query_proof_chain_verifies() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db.clone());
    root.mount_store(acc_key(), None).unwrap();
    root.load_latest_version().unwrap();

    root.get_kv(&acc_key()).unwrap().set(b"k", b"v").unwrap();
    let committed = root.commit().unwrap();

    let res = root.query(QueryRequest {
        path: "/acc/key".into(),
        data: b"k".to_vec(),
        height: 0,
        prove: true,
    });
    assert!(res.is_ok(), "query failed: {}", res.log);
    assert_eq!(res.value, b"v".to_vec());
    assert_eq!(res.height, committed.version);

    let proof = res.proof.expect("proof requested");
    assert_eq!(proof.ops.len(), 2);

    // Step 1: the key is included in the sub-store's committed state.
    let info = commit_info_at(&db, committed.version);
    let store_core = info.store_info("acc").unwrap().core;
    let sub_root = store_core.commit_id.hash;

    let sub_op = &proof.ops[0];
    assert_eq!(sub_op.op_type, PROOF_OP_STORE_KEY);
    assert_eq!(sub_op.key, b"k".to_vec());
    let sub_proof = MapProof::decode(&sub_op.data).unwrap();
    assert!(sub_proof.verify(&sub_root, b"k", &Hash::from_bytes(b"v")));

    // Step 2: the sub-store is included under the multi-store root.
    let multi_op = &proof.ops[1];
    assert_eq!(multi_op.op_type, PROOF_OP_MULTISTORE);
    assert_eq!(multi_op.key, b"acc".to_vec());
    let multi_proof = MapProof::decode(&multi_op.data).unwrap();
    let leaf_value = Hash::from_bytes(&SborCodec.encode_store_core(&store_core).unwrap());
    assert!(multi_proof.verify(&committed.hash, b"acc", &leaf_value));
}

#[test]
fn test_dedicated_database_uses_reserved_prefix() {
    let root_db = Arc::new(MemDb::new());
    let dedicated = Arc::new(MemDb::new());

    let mut root = new_root(root_db.clone());
    let dedicated_db: Arc<dyn Database> = dedicated.clone();
    root.mount_store(acc_key(), Some(dedicated_db)).unwrap();
    root.load_latest_version().unwrap();

    root.get_kv(&acc_key()).unwrap().set(b"k", b"v").unwrap();
    root.commit().unwrap();

    // Store data lands in the dedicated database under s/_/, and only the
    // root's own records live in the root database.
    assert_eq!(dedicated.get(b"s/_/k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(root_db.get(b"s/_/k").unwrap(), None);
    assert!(root_db.get(keys::LATEST_VERSION_KEY).unwrap().is_some());
}

#[test]
fn test_shared_database_prefixes_are_isolated() {
    let db = Arc::new(MemDb::new());
    let mut root = new_root(db.clone());
    root.mount_store(acc_key(), None).unwrap();
    root.mount_store(gov_key(), None).unwrap();
    root.load_latest_version().unwrap();

    root.get_kv(&acc_key()).unwrap().set(b"k", b"acc-value").unwrap();
    root.get_kv(&gov_key()).unwrap().set(b"k", b"gov-value").unwrap();
    root.commit().unwrap();

    assert_eq!(db.get(b"s/k:acc/k").unwrap(), Some(b"acc-value".to_vec()));
    assert_eq!(db.get(b"s/k:gov/k").unwrap(), Some(b"gov-value".to_vec()));

    // Each store still reads its own value for the shared key name.
    assert_eq!(
        root.get_kv(&acc_key()).unwrap().get(b"k").unwrap(),
        Some(b"acc-value".to_vec())
    );
    assert_eq!(
        root.get_kv(&gov_key()).unwrap().get(b"k").unwrap(),
        Some(b"gov-value".to_vec())
    );
}

#[test]
fn test_prefix_view_never_leaks_outside_its_region() {
    let db: Arc<MemDb> = Arc::new(MemDb::new());
    db.set(b"before", b"x").unwrap();
    db.set(b"p/zz", b"x").unwrap();
    db.set(b"q", b"x").unwrap();

    let view = PrefixDb::new(db.clone(), b"p/");
    view.set(b"a", b"1").unwrap();
    view.set(b"b", b"2").unwrap();

    let keys_seen: Vec<_> = view.iter(None, None).map(|(k, _)| k).collect();
    assert_eq!(
        keys_seen,
        vec![b"a".to_vec(), b"b".to_vec(), b"zz".to_vec()]
    );

    let rev_seen: Vec<_> = view.rev_iter(None, Some(b"b")).map(|(k, _)| k).collect();
    assert_eq!(rev_seen, vec![b"a".to_vec()]);

    // Underlying keys are prefixed; unrelated keys are untouched.
    assert_eq!(db.get(b"p/a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(db.get(b"before").unwrap(), Some(b"x".to_vec()));
}

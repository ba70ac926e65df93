//! Concrete sub-store implementations and their registry.
//!
//! The set of sub-store kinds is a closed sum type ([`crate::StoreKind`]);
//! [`open_store`] is the factory the root multi-store calls when loading a
//! version. There is no runtime type discovery: adding a kind means adding a
//! variant and a factory arm.

mod merkle;
mod plain;
mod transient;

pub use merkle::MerkleStore;
pub use plain::PlainStore;
pub use transient::TransientStore;

use crate::db::Database;
use crate::error::StoreError;
use crate::multi::StoreKind;
use crate::traits::{CommitKvStore, PruningPolicy};
use std::sync::Arc;
use strata_types::CommitId;

/// Open a sub-store of the given kind against its database view, loaded at
/// the state identified by `expected`.
pub(crate) fn open_store(
    kind: StoreKind,
    db: Arc<dyn Database>,
    expected: CommitId,
    pruning: PruningPolicy,
) -> Result<Box<dyn CommitKvStore>, StoreError> {
    match kind {
        StoreKind::Merkle => {
            let store = MerkleStore::load(db, expected)?;
            store.set_pruning(pruning);
            Ok(Box::new(store))
        }
        StoreKind::Transient => Ok(Box::new(TransientStore::new())),
        StoreKind::Plain => Ok(Box::new(PlainStore::new(db))),
    }
}

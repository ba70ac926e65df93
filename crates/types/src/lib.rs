//! Core types for the strata state store.
//!
//! This crate provides the foundation layer shared by the storage crates:
//!
//! - **Hashing**: the 32-byte [`Hash`] newtype over blake3
//! - **Merkle commitments**: deterministic root and inclusion proofs over an
//!   ordered map ([`merkle`])
//! - **Commit metadata**: [`CommitId`], [`StoreInfo`] and [`CommitInfo`], the
//!   per-version record of sub-store commits
//!
//! It does not depend on any other workspace crate.

mod commit;
mod hash;
pub mod merkle;

pub use commit::{CommitId, CommitInfo, StoreCore, StoreInfo};
pub use hash::{Hash, HexError};
pub use merkle::MapProof;

//! Deterministic merkle commitment over an ordered map.
//!
//! [`root_from_map`] produces a 32-byte root that is a pure function of the
//! map contents: entries are visited in ascending key order, each hashed into
//! a domain-separated leaf, and the leaves combined pairwise into a binary
//! tree (odd nodes promote unchanged). The map values are *already* hashes;
//! callers decide how a value is reduced to its leaf value hash, so the same
//! primitive serves both raw key-value stores and commit metadata keyed by
//! store name.
//!
//! [`proof_from_map`] produces an inclusion proof for a single key, verifiable
//! against the root with [`MapProof::verify`].

use crate::Hash;
use sbor::prelude::*;
use std::collections::BTreeMap;

/// Domain separator for leaf nodes (prevents second-preimage attacks).
const LEAF_TAG: u8 = 0x00;
/// Domain separator for internal nodes.
const NODE_TAG: u8 = 0x01;

/// Hash a leaf: `H(LEAF_TAG || key_len_le32 || key || value_hash)`.
pub fn leaf_hash(key: &[u8], value_hash: &Hash) -> Hash {
    let key_len = (key.len() as u32).to_le_bytes();
    Hash::from_parts(&[&[LEAF_TAG], &key_len, key, value_hash.as_bytes()])
}

/// Hash an internal node: `H(NODE_TAG || left || right)`.
fn node_hash(left: &Hash, right: &Hash) -> Hash {
    Hash::from_parts(&[&[NODE_TAG], left.as_bytes(), right.as_bytes()])
}

/// Compute the merkle root of a map of `key -> value_hash`.
///
/// Returns [`Hash::ZERO`] for an empty map. Because `BTreeMap` iterates in
/// ascending key order, the result depends only on the map contents.
pub fn root_from_map(map: &BTreeMap<Vec<u8>, Hash>) -> Hash {
    let leaves: Vec<Hash> = map.iter().map(|(k, v)| leaf_hash(k, v)).collect();
    root_from_leaves(&leaves)
}

/// Produce an inclusion proof for `key`, or `None` if the key is absent.
pub fn proof_from_map(map: &BTreeMap<Vec<u8>, Hash>, key: &[u8]) -> Option<MapProof> {
    let index = map.keys().position(|k| k.as_slice() == key)?;
    let leaves: Vec<Hash> = map.iter().map(|(k, v)| leaf_hash(k, v)).collect();
    let (siblings, left_bits) = proof_path(&leaves, index);
    Some(MapProof {
        siblings,
        left_bits,
    })
}

/// An inclusion proof for one entry of a merkle-ized map.
///
/// `siblings[i]` is the sibling hash at level `i`; `left_bits[i]` is true when
/// the running hash is the *left* input at that level. Levels where the node
/// has no sibling (odd tail, promoted unchanged) contribute no entry.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct MapProof {
    /// Sibling hashes along the path from leaf to root.
    pub siblings: Vec<Hash>,
    /// Whether the running hash is the left input at each level.
    pub left_bits: Vec<bool>,
}

impl MapProof {
    /// Verify this proof against `root` for the entry `key -> value_hash`.
    pub fn verify(&self, root: &Hash, key: &[u8], value_hash: &Hash) -> bool {
        if self.siblings.len() != self.left_bits.len() {
            return false;
        }

        let mut current = leaf_hash(key, value_hash);
        for (sibling, is_left) in self.siblings.iter().zip(self.left_bits.iter()) {
            current = if *is_left {
                node_hash(&current, sibling)
            } else {
                node_hash(sibling, &current)
            };
        }

        current == *root
    }

    /// Serialize to the deterministic wire form.
    pub fn encode(&self) -> Vec<u8> {
        sbor::basic_encode(self).expect("map proof encoding cannot fail")
    }

    /// Parse from the wire form produced by [`MapProof::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, sbor::DecodeError> {
        sbor::basic_decode(bytes)
    }
}

/// Combine leaf hashes pairwise into a root, promoting odd tails unchanged.
fn root_from_leaves(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return Hash::ZERO;
    }

    let mut level: Vec<Hash> = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for chunk in level.chunks(2) {
            if chunk.len() == 2 {
                next.push(node_hash(&chunk[0], &chunk[1]));
            } else {
                next.push(chunk[0]);
            }
        }
        level = next;
    }

    level[0]
}

/// Collect the sibling hashes and direction bits for the leaf at `index`.
fn proof_path(leaves: &[Hash], index: usize) -> (Vec<Hash>, Vec<bool>) {
    let mut siblings = Vec::new();
    let mut left_bits = Vec::new();
    let mut level: Vec<Hash> = leaves.to_vec();
    let mut idx = index;

    while level.len() > 1 {
        let is_left = idx % 2 == 0;
        let sibling_idx = if is_left { idx + 1 } else { idx - 1 };
        if sibling_idx < level.len() {
            siblings.push(level[sibling_idx]);
            left_bits.push(is_left);
        }

        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for chunk in level.chunks(2) {
            if chunk.len() == 2 {
                next.push(node_hash(&chunk[0], &chunk[1]));
            } else {
                next.push(chunk[0]);
            }
        }

        idx /= 2;
        level = next;
    }

    (siblings, left_bits)
}

//! Injected serialization for persisted commit metadata.
//!
//! The root multi-store never serializes directly: it goes through a [`Codec`]
//! handle supplied at construction, so the encoding is swappable and mockable
//! in tests. [`SborCodec`] is the default implementation; SBOR is
//! length-delimited and gives byte-identical output for identical input,
//! which the commit root hash depends on.

use strata_types::{CommitInfo, StoreCore};
use thiserror::Error;

/// Serialization failure.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("encode failed: {0}")]
    Encode(String),
    /// Decoding failed.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Deterministic binary encoder for commit metadata.
///
/// Implementations must be pure: identical input yields byte-identical
/// output, since the encoded [`StoreCore`] feeds the top-level root hash.
pub trait Codec: Send + Sync {
    /// Encode a commit info record.
    fn encode_commit_info(&self, info: &CommitInfo) -> Result<Vec<u8>, CodecError>;

    /// Decode a commit info record.
    fn decode_commit_info(&self, bytes: &[u8]) -> Result<CommitInfo, CodecError>;

    /// Encode a store core (the leaf pre-image of the top-level root).
    fn encode_store_core(&self, core: &StoreCore) -> Result<Vec<u8>, CodecError>;

    /// Encode a version number.
    fn encode_version(&self, version: u64) -> Result<Vec<u8>, CodecError>;

    /// Decode a version number.
    fn decode_version(&self, bytes: &[u8]) -> Result<u64, CodecError>;
}

/// The default [`Codec`], backed by basic SBOR.
#[derive(Debug, Default, Clone, Copy)]
pub struct SborCodec;

impl Codec for SborCodec {
    fn encode_commit_info(&self, info: &CommitInfo) -> Result<Vec<u8>, CodecError> {
        sbor::basic_encode(info).map_err(|e| CodecError::Encode(format!("{e:?}")))
    }

    fn decode_commit_info(&self, bytes: &[u8]) -> Result<CommitInfo, CodecError> {
        sbor::basic_decode(bytes).map_err(|e| CodecError::Decode(format!("{e:?}")))
    }

    fn encode_store_core(&self, core: &StoreCore) -> Result<Vec<u8>, CodecError> {
        sbor::basic_encode(core).map_err(|e| CodecError::Encode(format!("{e:?}")))
    }

    fn encode_version(&self, version: u64) -> Result<Vec<u8>, CodecError> {
        sbor::basic_encode(&version).map_err(|e| CodecError::Encode(format!("{e:?}")))
    }

    fn decode_version(&self, bytes: &[u8]) -> Result<u64, CodecError> {
        sbor::basic_decode(bytes).map_err(|e| CodecError::Decode(format!("{e:?}")))
    }
}

//! Query envelope and path routing.
//!
//! Queries address a sub-store by path: `/<store_name>[/<rest>]`. The root
//! multi-store strips the store name and forwards the rest to the sub-store.
//! Errors travel as structured responses with a non-zero code, never as
//! `Err` returns, so a remote caller always receives a well-formed reply.

/// Query succeeded.
pub const CODE_OK: u32 = 0;
/// The request path did not start with `/`.
pub const CODE_INVALID_PATH: u32 = 1;
/// The path named a store that is not mounted.
pub const CODE_UNKNOWN_STORE: u32 = 2;
/// The target store does not answer queries.
pub const CODE_UNSUPPORTED_QUERY: u32 = 3;
/// The store could not serve this request.
pub const CODE_INTERNAL: u32 = 4;

/// Proof op type for a sub-store key inclusion proof.
pub const PROOF_OP_STORE_KEY: &str = "store:key";
/// Proof op type for the multi-store's store-name inclusion proof.
pub const PROOF_OP_MULTISTORE: &str = "multistore:store";

/// A routed query.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Request path: `/<store_name>[/<rest>]` at the multi-store, the bare
    /// `<rest>` once routed to the sub-store.
    pub path: String,
    /// Request payload; for key queries, the key itself.
    pub data: Vec<u8>,
    /// Requested version (0 means latest).
    pub height: u64,
    /// Whether to attach an inclusion proof to the response.
    pub prove: bool,
}

/// A query result. `code == 0` means success; anything else is a structured
/// error with detail in `log`.
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    /// Result code; [`CODE_OK`] on success.
    pub code: u32,
    /// Human-readable error detail; empty on success.
    pub log: String,
    /// The key the response refers to.
    pub key: Vec<u8>,
    /// The value found, empty if absent.
    pub value: Vec<u8>,
    /// The committed version the response was served from.
    pub height: u64,
    /// Inclusion proof, when requested and available.
    pub proof: Option<Proof>,
}

impl QueryResponse {
    /// Build an error response.
    pub fn error(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
            ..Self::default()
        }
    }

    /// True if the query succeeded.
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// An ordered chain of proof operations, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proof {
    /// Proof operations: sub-store proof first, then the multi-store's
    /// top-level inclusion proof.
    pub ops: Vec<ProofOp>,
}

/// One step of a proof chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOp {
    /// Which kind of proof this is (see the `PROOF_OP_*` constants).
    pub op_type: String,
    /// The key proven at this step.
    pub key: Vec<u8>,
    /// The encoded proof itself.
    pub data: Vec<u8>,
}

/// Split `/<store_name>[/<rest>]` into the store name and the sub-path.
///
/// The sub-path keeps its leading slash and is empty when the path has a
/// single segment. Returns `None` unless the path starts with `/`.
pub fn parse_path(path: &str) -> Option<(&str, String)> {
    let rest = path.strip_prefix('/')?;
    match rest.split_once('/') {
        Some((store_name, subpath)) => Some((store_name, format!("/{subpath}"))),
        None => Some((rest, String::new())),
    }
}

/// Whether a proven query on this sub-path composes the top-level proof.
pub fn requires_proof(subpath: &str) -> bool {
    subpath == "/key"
}

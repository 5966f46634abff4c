use std::fmt;
use std::path::PathBuf;

use alloy::primitives::B256;
use thiserror::Error;

/// The root a derived value was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Transactions,
    Uncles,
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootKind::Transactions => f.write_str("transactions root"),
            RootKind::Uncles => f.write_str("uncles hash"),
        }
    }
}

/// The half of the output commitment a replay result disagreed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    StateRoot,
    ReceiptsRoot,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::StateRoot => f.write_str("state root"),
            OutputKind::ReceiptsRoot => f.write_str("receipts root"),
        }
    }
}

/// Everything that can go wrong while fetching, verifying and committing a
/// block transition.
///
/// Only [`OracleError::ProofFetchFailed`] and [`OracleError::CacheIo`] are
/// environmental; every other variant means the data cannot be trusted and
/// the run must stop.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("missing preimage for {hash}")]
    MissingPreimage { hash: B256 },

    #[error("a different value is already stored under {hash}")]
    PreimageConflict { hash: B256 },

    #[error("preimage offered for {expected} hashes to {actual}")]
    PreimageHashMismatch { expected: B256, actual: B256 },

    #[error("header {number} hashes to {actual}, but the node reported {expected}")]
    HeaderHashMismatch {
        number: u64,
        expected: B256,
        actual: B256,
    },

    #[error("block transition isn't correct: parent hash is {actual}, expected {expected}")]
    LinkageMismatch { expected: B256, actual: B256 },

    #[error("derived {kind} {actual} != {expected}")]
    RootMismatch {
        kind: RootKind,
        expected: B256,
        actual: B256,
    },

    #[error("replayed {kind} {actual} != committed {expected}")]
    OutputMismatch {
        kind: OutputKind,
        expected: B256,
        actual: B256,
    },

    #[error("{method} failed: {reason}")]
    ProofFetchFailed { method: String, reason: String },

    #[error("cache I/O on {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no address was fetched for hash {hash}")]
    UnknownAddressHash { hash: B256 },

    #[error("couldn't decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("stopped by abort signal")]
    Aborted,
}

impl OracleError {
    /// Whether the run has to stop, as opposed to retrying the operation.
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            OracleError::ProofFetchFailed { .. } | OracleError::CacheIo { .. }
        )
    }

    pub(crate) fn fetch(method: &str, reason: impl fmt::Display) -> Self {
        OracleError::ProofFetchFailed {
            method: method.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(what: &'static str, reason: impl fmt::Display) -> Self {
        OracleError::Decode {
            what,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OracleError::CacheIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = OracleError> = std::result::Result<T, E>;

//! Preimage oracle for block-transition fault proofs.
//!
//! The oracle fetches everything a replay of one block needs from a node,
//! verifies it against the parent and child headers, and stores it as
//! keccak256-addressed preimages. The transition itself is committed as a
//! 32-byte input hash and a 64-byte output pair.

pub mod assembler;
pub mod commitment;
pub mod config;
pub mod error;
pub mod header;
pub mod replay;
pub mod rpc;
pub mod store;

pub use assembler::{BlockAssembler, BlockRole};
pub use commitment::{Commitment, InputVector, OutputVector};
pub use config::OracleConfig;
pub use error::{OracleError, OutputKind, Result, RootKind};
pub use header::{RpcBlock, RpcHeader};
pub use rpc::{ProofClient, ProofResult, RequestCache};
pub use store::PreimageStore;

/// `0x`-prefixed hex quantities as returned by JSON-RPC, e.g. `"0x1b4"`.
pub(crate) mod quantity {
    use serde::{de::Error as _, Deserialize as _, Deserializer};

    pub fn parse(s: &str) -> Result<u64, String> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| format!("quantity {s:?} has no 0x prefix"))?;
        u64::from_str_radix(digits, 16).map_err(|e| format!("quantity {s:?}: {e}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(D::Error::custom)
    }

    pub fn deserialize_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| parse(&s).map_err(D::Error::custom))
            .transpose()
    }

}

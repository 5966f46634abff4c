//! JSON-RPC plumbing: wire types, the transport seam, retries, the on-disk
//! request cache and the proof client built on top of them.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};
use crate::quantity;

mod cache;
mod client;
mod retry;
mod transport;

pub use cache::RequestCache;
pub use client::{FetchKey, ProofClient};
pub use retry::{RetryPolicy, RetryTransport};
pub use transport::{HttpTransport, RpcTransport, TransportError};

/// Sent with every call. A fixed id keeps request bodies, and so cache keys,
/// stable across runs.
const REQUEST_ID: u64 = 1;

#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub(crate) fn new(method: &'a str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id: REQUEST_ID,
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| OracleError::fetch(self.method, e))
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    /// Parses a response body, accepting only a success envelope with a
    /// non-null `result`.
    pub(crate) fn parse(method: &str, body: &[u8]) -> Result<serde_json::Value> {
        let response: JsonRpcResponse = serde_json::from_slice(body)
            .map_err(|e| OracleError::fetch(method, format!("malformed response: {e}")))?;
        if let Some(err) = response.error {
            return Err(OracleError::fetch(
                method,
                format!("node returned error {}: {}", err.code, err.message),
            ));
        }
        match response.result {
            None | Some(serde_json::Value::Null) => {
                Err(OracleError::fetch(method, "response has no result"))
            }
            Some(result) => Ok(result),
        }
    }
}

/// `eth_getProof` result as sent by the node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EthProof {
    pub address: Address,
    pub account_proof: Vec<String>,
    pub balance: U256,
    pub code_hash: B256,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub nonce: u64,
    pub storage_hash: B256,
    #[serde(default)]
    pub storage_proof: Vec<EthStorageProof>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EthStorageProof {
    pub value: U256,
    pub proof: Vec<String>,
}

/// A verified-shape account or storage proof.
///
/// `account_proof` holds the decoded nodes from the state root to the
/// account. For storage requests `storage` carries the slot's value and the
/// nodes from the storage root to the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofResult {
    pub address: Address,
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: B256,
    pub storage_hash: B256,
    pub account_proof: Vec<Bytes>,
    pub storage: Option<StorageResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageResult {
    pub slot: B256,
    pub value: U256,
    pub proof: Vec<Bytes>,
}

/// Decodes `0x`-prefixed hex data, such as a proof node or contract code.
pub(crate) fn decode_hex(what: &'static str, data: &str) -> Result<Bytes> {
    let digits = data
        .strip_prefix("0x")
        .ok_or_else(|| OracleError::decode(what, format!("{data:?} has no 0x prefix")))?;
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| OracleError::decode(what, e))
}

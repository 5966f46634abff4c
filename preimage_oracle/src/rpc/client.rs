use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, Bytes, B256};
use cannon_common::EMPTY_TRIE_HASH;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use super::{
    decode_hex, EthProof, EthStorageProof, JsonRpcRequest, JsonRpcResponse, ProofResult,
    RequestCache, RpcTransport, StorageResult,
};
use crate::error::{OracleError, Result};
use crate::header::{RpcBlock, RpcHeader};
use crate::quantity;
use crate::store::PreimageStore;

const GET_PROOF: &str = "eth_getProof";

/// A logical fetch, independent of how it is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKey {
    Account(u64, Address),
    Storage(u64, Address, B256),
    Code(u64, B256),
}

/// Fetches proofs, code and headers from a node, caching raw responses on
/// disk and feeding every proof node and code blob into the preimage store.
///
/// Each account, storage slot and code blob is fetched at most once per
/// client; asking again returns `Ok(None)`.
pub struct ProofClient<T> {
    transport: T,
    cache: RequestCache,
    store: Arc<PreimageStore>,
    fetched: Mutex<HashSet<FetchKey>>,
    address_by_hash: RwLock<HashMap<B256, Address>>,
}

impl<T> ProofClient<T>
where
    T: RpcTransport,
{
    pub fn new(transport: T, cache: RequestCache, store: Arc<PreimageStore>) -> Self {
        Self {
            transport,
            cache,
            store,
            fetched: Mutex::default(),
            address_by_hash: RwLock::default(),
        }
    }

    pub fn store(&self) -> &Arc<PreimageStore> {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn has_fetched(&self, key: &FetchKey) -> bool {
        self.fetched.lock().contains(key)
    }

    pub async fn get_block_by_number(&self, number: u64) -> Result<RpcBlock> {
        self.request("eth_getBlockByNumber", json!([format!("{number:#x}"), true]))
            .await
    }

    pub async fn get_uncle_count(&self, block_hash: B256) -> Result<u64> {
        const METHOD: &str = "eth_getUncleCountByBlockHash";
        let count: String = self.request(METHOD, json!([block_hash])).await?;
        quantity::parse(&count).map_err(|e| OracleError::fetch(METHOD, e))
    }

    pub async fn get_uncle(&self, block_hash: B256, index: u64) -> Result<RpcHeader> {
        self.request(
            "eth_getUncleByBlockHashAndIndex",
            json!([block_hash, format!("{index:#x}")]),
        )
        .await
    }

    /// Fetches the proof of `address` at `block` and stores its nodes.
    pub async fn get_account_proof(
        &self,
        block: u64,
        address: Address,
    ) -> Result<Option<ProofResult>> {
        let key = FetchKey::Account(block, address);
        if self.has_fetched(&key) {
            return Ok(None);
        }
        self.remember_address(address);

        let proof: EthProof = self
            .request(GET_PROOF, json!([address, [], format!("{block:#x}")]))
            .await?;
        let result = self.store_proof(proof, None)?;

        self.fetched.lock().insert(key);
        Ok(Some(result))
    }

    /// Fetches the proof of `slot` in the storage of `address` at `block`
    /// and stores its nodes.
    pub async fn get_storage_proof(
        &self,
        block: u64,
        address: Address,
        slot: B256,
    ) -> Result<Option<ProofResult>> {
        let key = FetchKey::Storage(block, address, slot);
        if self.has_fetched(&key) {
            return Ok(None);
        }
        self.remember_address(address);

        let proof: EthProof = self
            .request(GET_PROOF, json!([address, [slot], format!("{block:#x}")]))
            .await?;
        let result = self.store_proof(proof, Some(slot))?;

        self.fetched.lock().insert(key);
        Ok(Some(result))
    }

    /// Fetches the code of the account whose address hashes to
    /// `address_hash`. The address must have been seen in an earlier proof
    /// request.
    pub async fn get_code(&self, block: u64, address_hash: B256) -> Result<Option<Bytes>> {
        let key = FetchKey::Code(block, address_hash);
        if self.has_fetched(&key) {
            return Ok(None);
        }
        let address = self
            .address_by_hash
            .read()
            .get(&address_hash)
            .copied()
            .ok_or(OracleError::UnknownAddressHash { hash: address_hash })?;

        let code: String = self
            .request("eth_getCode", json!([address, format!("{block:#x}")]))
            .await?;
        let code = decode_hex("code", &code)?;
        self.store.insert(code.clone())?;

        self.fetched.lock().insert(key);
        Ok(Some(code))
    }

    fn remember_address(&self, address: Address) {
        self.address_by_hash
            .write()
            .insert(keccak256(address), address);
    }

    fn store_proof(&self, proof: EthProof, slot: Option<B256>) -> Result<ProofResult> {
        let EthProof {
            address,
            account_proof,
            balance,
            code_hash,
            nonce,
            storage_hash,
            storage_proof,
        } = proof;

        // Even an absent account has a path from the state root.
        if account_proof.is_empty() {
            return Err(OracleError::fetch(
                GET_PROOF,
                format!("empty account proof for {address}"),
            ));
        }
        let storage = slot
            .map(|slot| self.store_storage_proof(slot, storage_hash, storage_proof))
            .transpose()?;

        Ok(ProofResult {
            address,
            balance,
            nonce,
            code_hash,
            storage_hash,
            account_proof: self.store_nodes(&account_proof)?,
            storage,
        })
    }

    fn store_storage_proof(
        &self,
        slot: B256,
        storage_hash: B256,
        entries: Vec<EthStorageProof>,
    ) -> Result<StorageResult> {
        let [entry] = <[EthStorageProof; 1]>::try_from(entries).map_err(|entries| {
            OracleError::fetch(
                GET_PROOF,
                format!("expected one storage proof for {slot}, got {}", entries.len()),
            )
        })?;
        if entry.proof.is_empty() && storage_hash != EMPTY_TRIE_HASH {
            return Err(OracleError::fetch(
                GET_PROOF,
                format!("empty storage proof for {slot} under non-empty root {storage_hash}"),
            ));
        }
        Ok(StorageResult {
            slot,
            value: entry.value,
            proof: self.store_nodes(&entry.proof)?,
        })
    }

    fn store_nodes(&self, nodes: &[String]) -> Result<Vec<Bytes>> {
        nodes
            .iter()
            .map(|node| {
                let node = decode_hex("proof node", node)?;
                self.store.insert(node.clone())?;
                Ok(node)
            })
            .collect()
    }

    async fn request<R: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<R> {
        let body = JsonRpcRequest::new(method, params).to_bytes()?;
        let key = keccak256(&body);

        let cached = self
            .cache
            .read(&key)
            .map(|response| JsonRpcResponse::parse(method, &response));
        let result = match cached {
            Some(Ok(result)) => {
                debug!(method, %key, "cache hit");
                result
            }
            Some(Err(err)) => {
                warn!(method, %key, %err, "discarding unusable cache entry");
                self.fetch(method, key, body).await?
            }
            None => {
                debug!(method, %key, "cache miss");
                self.fetch(method, key, body).await?
            }
        };

        serde_json::from_value(result)
            .map_err(|e| OracleError::fetch(method, format!("unexpected result: {e}")))
    }

    async fn fetch(&self, method: &str, key: B256, body: Vec<u8>) -> Result<serde_json::Value> {
        let response = self
            .transport
            .post(body)
            .await
            .map_err(|e| OracleError::fetch(method, e))?;
        let result = JsonRpcResponse::parse(method, &response)?;

        if let Err(err) = self.cache.write(&key, &response) {
            warn!(method, %err, "couldn't cache response");
        }
        Ok(result)
    }
}

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy::primitives::{b256, Bloom, B256};
use preimage_oracle::rpc::{RpcTransport, TransportError};
use preimage_oracle::{PreimageStore, ProofClient, RequestCache};
use serde_json::{json, Value};

pub const GENESIS_HASH: B256 =
    b256!("d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3");
pub const BLOCK_1_HASH: B256 =
    b256!("88e96d4537bea4d9c05d12549907b32561d3bf31f45aae734cdc119f13406cb6");
pub const BLOCK_2_HASH: B256 =
    b256!("40eaed3736fe70d353ec3dc51783b5a11434028a9a50876ede15b8824d84524f");
pub const BLOCK_2_TX_ROOT: B256 =
    b256!("a4daa0d349a46ba363d2825c2caffb328f4bf0ff82b0efa055e79e17504208cc");
pub const BLOCK_2_UNCLES_HASH: B256 =
    b256!("2a5c0515f0cd69ba41c9fa4f694015e476f0633e30e70eeb8520d747b98b2c4a");
pub const UNCLE_HASH: B256 =
    b256!("445435bc4d9d22c0e004f8a091926301e307f6f70bb93a00d20f675b4c521f2d");
/// In block order: the first mainnet transaction (pre-EIP-155), an EIP-155
/// transfer and an EIP-1559 transfer.
pub const BLOCK_2_TX_HASHES: [B256; 3] = [
    b256!("5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060"),
    b256!("c3c5f700243de37ae986082fd2af88d2a7c2752a0c0f7b9d6ac47c729d45e067"),
    b256!("36055d173880dd87a104628d057bcad5de96613143d07b2d4d1d96687b32a2b9"),
];
pub const EMPTY_LIST_HASH: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");
pub const EMPTY_TRIE_HASH: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Answers JSON-RPC requests from a fixed table of `(method, params)` to
/// result, and counts every request that reaches it. Anything not in the
/// table gets a JSON-RPC error.
#[derive(Default)]
pub struct Canned {
    results: HashMap<(String, String), Value>,
    errors: HashMap<(String, String), String>,
    calls: AtomicUsize,
}

impl Canned {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: &str, params: Value, result: Value) -> Self {
        self.results.insert((method.to_owned(), params.to_string()), result);
        self
    }

    pub fn with_error(mut self, method: &str, params: Value, message: &str) -> Self {
        self.errors
            .insert((method.to_owned(), params.to_string()), message.to_owned());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Blocks 0 and 1 of mainnet, neither of which has uncles.
    pub fn mainnet() -> Self {
        Self::new()
            .with("eth_getBlockByNumber", json!(["0x0", true]), genesis_json())
            .with("eth_getBlockByNumber", json!(["0x1", true]), block_1_json())
            .with("eth_getUncleCountByBlockHash", json!([BLOCK_1_HASH]), json!("0x0"))
    }

    /// Mainnet blocks 0 and 1 followed by [`block_2_json`] and its uncle.
    pub fn busy_chain() -> Self {
        Self::mainnet()
            .with("eth_getBlockByNumber", json!(["0x2", true]), block_2_json())
            .with("eth_getUncleCountByBlockHash", json!([BLOCK_2_HASH]), json!("0x1"))
            .with(
                "eth_getUncleByBlockHashAndIndex",
                json!([BLOCK_2_HASH, "0x0"]),
                uncle_json(),
            )
    }
}

impl RpcTransport for Canned {
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request: Value =
            serde_json::from_slice(&body).map_err(|e| TransportError::Other(e.to_string()))?;
        let id = request["id"].clone();
        let key = (
            request["method"].as_str().unwrap_or_default().to_owned(),
            request["params"].to_string(),
        );

        let response = match (self.results.get(&key), self.errors.get(&key)) {
            (Some(result), _) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            (None, Some(message)) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32000, "message": message },
            }),
            (None, None) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("not canned: {key:?}") },
            }),
        };
        Ok(response.to_string().into_bytes())
    }
}

pub fn client(transport: Canned, dir: &Path) -> ProofClient<Canned> {
    ProofClient::new(
        transport,
        RequestCache::new(dir),
        Arc::new(PreimageStore::with_disk(dir)),
    )
}

pub fn genesis_json() -> Value {
    json!({
        "hash": GENESIS_HASH,
        "parentHash": B256::ZERO,
        "sha3Uncles": EMPTY_LIST_HASH,
        "miner": "0x0000000000000000000000000000000000000000",
        "stateRoot": "0xd7f8974fb5ac78d9ac099b9ad5018bedc2ce0a72dad1827a1709da30580f0544",
        "transactionsRoot": EMPTY_TRIE_HASH,
        "receiptsRoot": EMPTY_TRIE_HASH,
        "logsBloom": Bloom::ZERO,
        "difficulty": "0x400000000",
        "number": "0x0",
        "gasLimit": "0x1388",
        "gasUsed": "0x0",
        "timestamp": "0x0",
        "extraData": "0x11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa",
        "mixHash": B256::ZERO,
        "nonce": "0x0000000000000042",
        "size": "0x21c",
        "totalDifficulty": "0x400000000",
        "transactions": [],
        "uncles": [],
    })
}

pub fn block_1_json() -> Value {
    json!({
        "hash": BLOCK_1_HASH,
        "parentHash": GENESIS_HASH,
        "sha3Uncles": EMPTY_LIST_HASH,
        "miner": "0x05a56e2d52c817161883f50c441c3228cfe54d9f",
        "stateRoot": "0xd67e4d450343046425ae4271474353857ab860dbc0a1dde64b41b5cd3a532bf3",
        "transactionsRoot": EMPTY_TRIE_HASH,
        "receiptsRoot": EMPTY_TRIE_HASH,
        "logsBloom": Bloom::ZERO,
        "difficulty": "0x3ff800000",
        "number": "0x1",
        "gasLimit": "0x1388",
        "gasUsed": "0x0",
        "timestamp": "0x55ba4224",
        "extraData": "0x476574682f76312e302e302f6c696e75782f676f312e342e32",
        "mixHash": "0x969b900de27b6ac6a67742365dd65f55a0526c41fd18e1b16f1a1215c2e66f59",
        "nonce": "0x539bd4979fef1ec4",
        "size": "0x219",
        "totalDifficulty": "0x7ff800000",
        "transactions": [],
        "uncles": [],
    })
}

/// Removes the header fields a node would not send for an uncle.
pub fn as_uncle(mut block: Value) -> Value {
    if let Some(fields) = block.as_object_mut() {
        fields.remove("transactions");
        fields.remove("totalDifficulty");
    }
    block
}

/// A block on top of mainnet block 1 carrying one transaction of each
/// signature scheme and one uncle.
pub fn block_2_json() -> Value {
    json!({
        "hash": BLOCK_2_HASH,
        "parentHash": BLOCK_1_HASH,
        "sha3Uncles": BLOCK_2_UNCLES_HASH,
        "miner": "0x05a56e2d52c817161883f50c441c3228cfe54d9f",
        "stateRoot": "0x4e3a5c9b8f1d2e7a6c0b9d8e7f6a5b4c3d2e1f0a9b8c7d6e5f4a3b2c1d0e9f8a",
        "transactionsRoot": BLOCK_2_TX_ROOT,
        "receiptsRoot": "0x1c8f6e4d3b2a19087f6e5d4c3b2a19087f6e5d4c3b2a19087f6e5d4c3b2a1908",
        "logsBloom": Bloom::ZERO,
        "difficulty": "0x3ff001000",
        "number": "0x2",
        "gasLimit": "0x2fefd8",
        "gasUsed": "0xf618",
        "timestamp": "0x55ba4242",
        "extraData": "0x476574682f76312e302e302f6c696e75782f676f312e342e32",
        "mixHash": "0xdd2e76e5c3a6b6e5d1b1a8f2c9a3e0f6b4d8c2a1e9f7d3b5c6a8e0f2d4b6c8a0",
        "nonce": "0x2e9344e0cbde83ce",
        "size": "0x4f1",
        "totalDifficulty": "0xbfe801000",
        "transactions": [
            {
                "hash": BLOCK_2_TX_HASHES[0],
                "nonce": "0x0",
                "blockHash": BLOCK_2_HASH,
                "blockNumber": "0x2",
                "transactionIndex": "0x0",
                "from": "0xa1e4380a3b1f749673e270229993ee55f35663b4",
                "to": "0x5df9b87991262f6ba471f09758cde1c0fc1de734",
                "value": "0x7a69",
                "gas": "0x5208",
                "gasPrice": "0x2d79883d2000",
                "input": "0x",
                "type": "0x0",
                "v": "0x1c",
                "r": "0x88ff6cf0fefd94db46111149ae4bfc179e9b94721fffd821d38d16464b3f71d0",
                "s": "0x45e0aff800961cfce805daef7016b9b675c137a6a41a548f7b60a3484c06a33a",
            },
            {
                "hash": BLOCK_2_TX_HASHES[1],
                "nonce": "0x2",
                "blockHash": BLOCK_2_HASH,
                "blockNumber": "0x2",
                "transactionIndex": "0x1",
                "from": "0xfdcedc3bfca10ecb0890337fbdd1977aba84807a",
                "to": "0xdca8ce283150ab773bcbeb8d38289bdb5661de1e",
                "value": "0x0",
                "gas": "0x15f90",
                "gasPrice": "0x4a817c800",
                "input": "0x",
                "type": "0x0",
                "chainId": "0x1",
                "v": "0x25",
                "r": "0x19f2694eb9113656dbea0b925e2e7ceb43df83e601c4116aee9c0dd99130be88",
                "s": "0x73e5764b324a4f7679d890a198ba658ba1c8cd36983ff9797e10b1b89dbb448e",
            },
            {
                "hash": BLOCK_2_TX_HASHES[2],
                "nonce": "0x3",
                "blockHash": BLOCK_2_HASH,
                "blockNumber": "0x2",
                "transactionIndex": "0x2",
                "from": "0x8a8eafb1cf62bfbeb1741769dae1a9dd47996192",
                "to": "0xdca8ce283150ab773bcbeb8d38289bdb5661de1e",
                "value": "0x1",
                "gas": "0x5208",
                "gasPrice": "0x77359400",
                "maxFeePerGas": "0x77359400",
                "maxPriorityFeePerGas": "0x3b9aca00",
                "input": "0x",
                "type": "0x2",
                "chainId": "0x1",
                "accessList": [],
                "v": "0x1",
                "yParity": "0x1",
                "r": "0x4b3d4aa4a3a6f2b7e13a25e1f0b1e1b6a8c7a5d0d2a3c4e7f9a1b3c5d7e9f1a3",
                "s": "0x2c1e5f3a7b9d0e4f6a8c1b3d5e7f9a0c2e4f6a8b0d1c3e5f7a9b1d3e5f7a9b1c",
            },
        ],
        "uncles": [UNCLE_HASH],
    })
}

/// The uncle included by [`block_2_json`], a sibling of mainnet block 1.
pub fn uncle_json() -> Value {
    json!({
        "hash": UNCLE_HASH,
        "parentHash": GENESIS_HASH,
        "sha3Uncles": EMPTY_LIST_HASH,
        "miner": "0xc8ebccc5f5689fa8659d83713341e5ad19349448",
        "stateRoot": "0x0b8d2f1c3f7ab4e2b6f8f3c4c1d3ffc1a4e8bd6a1f1e7b8c6f0e3d2c1b0a9f8e",
        "transactionsRoot": EMPTY_TRIE_HASH,
        "receiptsRoot": EMPTY_TRIE_HASH,
        "logsBloom": Bloom::ZERO,
        "difficulty": "0x3ff800000",
        "number": "0x1",
        "gasLimit": "0x1388",
        "gasUsed": "0x0",
        "timestamp": "0x55ba4230",
        "extraData": "0x59617465732052616e64616c6c202d2045746865724e696e6a61",
        "mixHash": "0x2f0790c5aa31ab94195e1f6443d645af5b75c46c04fbf9911711198a0ce8fdda",
        "nonce": "0xb853fa261a86aa9e",
        "size": "0x215",
        "uncles": [],
    })
}

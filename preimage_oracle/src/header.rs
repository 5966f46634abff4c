//! Block headers as returned by a node, and their canonical RLP form.

use alloy::consensus::Header;
use alloy::primitives::{Address, Bloom, Bytes, B256, B64, U256};
use alloy::rlp;
use alloy::rpc::types::Transaction;
use serde::Deserialize;
use tracing::error;

use crate::error::{OracleError, Result};
use crate::quantity;

/// The canonical RLP encoding of `header`, i.e. the preimage of its hash.
pub fn encode_header(header: &Header) -> Vec<u8> {
    rlp::encode(header)
}

pub fn decode_header(bytes: &[u8]) -> Result<Header> {
    decode_exact("header", bytes)
}

/// RLP encoding of a list of headers, as committed to by a block's uncle
/// hash.
pub fn encode_header_list(headers: &[Header]) -> Vec<u8> {
    let mut out = Vec::new();
    rlp::encode_list::<_, Header>(headers, &mut out);
    out
}

pub fn decode_header_list(bytes: &[u8]) -> Result<Vec<Header>> {
    decode_exact("header list", bytes)
}

fn decode_exact<T: rlp::Decodable>(what: &'static str, mut bytes: &[u8]) -> Result<T> {
    let value = T::decode(&mut bytes).map_err(|e| OracleError::decode(what, e))?;
    if !bytes.is_empty() {
        return Err(OracleError::decode(
            what,
            format!("{} trailing bytes", bytes.len()),
        ));
    }
    Ok(value)
}

/// A block or uncle header as a node reports it, together with the hash the
/// node claims for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcHeader {
    pub hash: B256,
    pub parent_hash: B256,
    #[serde(rename = "sha3Uncles")]
    pub uncle_hash: B256,
    #[serde(rename = "miner")]
    pub coinbase: Address,
    pub state_root: B256,
    #[serde(rename = "transactionsRoot")]
    pub tx_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub number: u64,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub gas_limit: u64,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub gas_used: u64,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub timestamp: u64,
    pub extra_data: Bytes,
    #[serde(default)]
    pub mix_hash: Option<B256>,
    #[serde(default)]
    pub nonce: Option<B64>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub base_fee_per_gas: Option<u64>,
    #[serde(default)]
    pub withdrawals_root: Option<B256>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub blob_gas_used: Option<u64>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub excess_blob_gas: Option<u64>,
    #[serde(default)]
    pub parent_beacon_block_root: Option<B256>,
}

impl RpcHeader {
    /// The consensus header these fields describe.
    pub fn to_header(&self) -> Header {
        Header {
            parent_hash: self.parent_hash,
            ommers_hash: self.uncle_hash,
            beneficiary: self.coinbase,
            state_root: self.state_root,
            transactions_root: self.tx_root,
            receipts_root: self.receipts_root,
            logs_bloom: self.logs_bloom,
            difficulty: self.difficulty,
            number: self.number,
            gas_limit: self.gas_limit.into(),
            gas_used: self.gas_used.into(),
            timestamp: self.timestamp,
            extra_data: self.extra_data.clone(),
            mix_hash: self.mix_hash.unwrap_or_default(),
            nonce: self.nonce.unwrap_or_default(),
            base_fee_per_gas: self.base_fee_per_gas.map(Into::into),
            withdrawals_root: self.withdrawals_root,
            blob_gas_used: self.blob_gas_used.map(Into::into),
            excess_blob_gas: self.excess_blob_gas.map(Into::into),
            parent_beacon_block_root: self.parent_beacon_block_root,
            ..Default::default()
        }
    }

    /// Rebuilds the consensus header and checks that it hashes to the
    /// reported hash.
    pub fn verify(&self) -> Result<Header> {
        let header = self.to_header();
        let actual = header.hash_slow();
        if actual != self.hash {
            error!(number = self.number, expected = %self.hash, %actual, "header hash mismatch");
            return Err(OracleError::HeaderHashMismatch {
                number: self.number,
                expected: self.hash,
                actual,
            });
        }
        Ok(header)
    }
}

/// The result of `eth_getBlockByNumber` with full transaction objects.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcBlock {
    #[serde(flatten)]
    pub header: RpcHeader,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

//! Rebuilds a child block template from an input hash alone, reading
//! everything through the preimage store.
//!
//! This is the read side of the oracle: nothing here talks to a node.
//! Executing the transactions and computing the state root is left to the
//! caller.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy::consensus::Header;
use alloy::primitives::{keccak256, Address, B256, U256};
use tracing::{debug, error};

use crate::commitment::InputVector;
use crate::error::{OracleError, Result, RootKind};
use crate::header::{decode_header, decode_header_list, encode_header_list};
use crate::store::PreimageStore;

/// First block with a base fee.
pub const LONDON_BLOCK: u64 = 12_965_000;
/// Base fee of the London activation block, in wei.
pub const INITIAL_BASE_FEE: u64 = 1_000_000_000;
const ELASTICITY_MULTIPLIER: u64 = 2;
const BASE_FEE_MAX_CHANGE_DENOMINATOR: u64 = 8;

/// The child header fields known before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    pub parent_hash: B256,
    pub number: u64,
    pub tx_root: B256,
    pub coinbase: Address,
    pub uncle_hash: B256,
    pub gas_limit: u64,
    pub timestamp: u64,
    pub base_fee_per_gas: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    pub parent: Header,
    pub header: HeaderTemplate,
    pub uncles: Vec<Header>,
}

pub fn check_abort_signal(abort_signal: Option<&Arc<AtomicBool>>) -> Result<()> {
    if let Some(signal) = abort_signal {
        if signal.load(Ordering::Relaxed) {
            return Err(OracleError::Aborted);
        }
    }

    Ok(())
}

/// Reads the input vector behind `input_hash` and rebuilds the child block
/// template it commits to.
pub fn rebuild_block(
    store: &PreimageStore,
    input_hash: B256,
    abort_signal: Option<Arc<AtomicBool>>,
) -> Result<BlockTemplate> {
    let abort_signal = abort_signal.as_ref();

    check_abort_signal(abort_signal)?;
    let inputs = InputVector::from_bytes(&store.get(&input_hash)?)?;

    check_abort_signal(abort_signal)?;
    let parent = decode_header(&store.get(&inputs.parent_hash())?)?;
    let number = parent.number.checked_add(1).ok_or_else(|| {
        OracleError::decode("parent header", format!("block {} has no successor", parent.number))
    })?;
    let header = HeaderTemplate {
        parent_hash: inputs.parent_hash(),
        number,
        tx_root: inputs.tx_root(),
        coinbase: inputs.coinbase()?,
        uncle_hash: inputs.uncle_hash(),
        gas_limit: inputs.gas_limit()?,
        timestamp: inputs.timestamp()?,
        base_fee_per_gas: calc_base_fee(&parent),
    };

    check_abort_signal(abort_signal)?;
    let uncles = decode_header_list(&store.get(&header.uncle_hash)?)?;
    let actual = keccak256(encode_header_list(&uncles));
    if actual != header.uncle_hash {
        error!(expected = %header.uncle_hash, %actual, "uncle list doesn't re-encode to its hash");
        return Err(OracleError::RootMismatch {
            kind: RootKind::Uncles,
            expected: header.uncle_hash,
            actual,
        });
    }

    debug!(number = header.number, %input_hash, uncles = uncles.len(), "rebuilt block template");
    Ok(BlockTemplate {
        parent,
        header,
        uncles,
    })
}

/// EIP-1559 base fee of the block following `parent`, or `None` before
/// London.
pub fn calc_base_fee(parent: &Header) -> Option<U256> {
    let Some(parent_base_fee) = parent.base_fee_per_gas.map(U256::from) else {
        return (parent.number == LONDON_BLOCK - 1).then(|| U256::from(INITIAL_BASE_FEE));
    };

    let gas_used = U256::from(parent.gas_used);
    let target = U256::from(parent.gas_limit) / U256::from(ELASTICITY_MULTIPLIER);
    if target.is_zero() {
        return Some(parent_base_fee);
    }
    let delta =
        |gas: U256| parent_base_fee * gas / target / U256::from(BASE_FEE_MAX_CHANGE_DENOMINATOR);

    Some(match gas_used.cmp(&target) {
        CmpOrdering::Equal => parent_base_fee,
        CmpOrdering::Greater => parent_base_fee + delta(gas_used - target).max(U256::from(1)),
        CmpOrdering::Less => parent_base_fee.saturating_sub(delta(target - gas_used)),
    })
}

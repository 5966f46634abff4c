//! The two commitments of a block transition.
//!
//! The input is six 32-byte words that fully determine what the child block
//! is built from; only its keccak256 hash is published. The output is the
//! child's state and receipts roots, published verbatim.

use std::fs;
use std::path::{Path, PathBuf};

use alloy::consensus::Header;
use alloy::primitives::{keccak256, Address, B256, U256};
use tracing::{debug, error, warn};

use crate::error::{OracleError, OutputKind, Result};
use crate::store::PreimageStore;

const INPUT_FILE: &str = "input";
const OUTPUT_FILE: &str = "output";
const WRITE_ATTEMPTS: u32 = 3;

/// `[parent_hash, tx_root, coinbase, uncle_hash, gas_limit, timestamp]`,
/// each left-padded to 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputVector(pub [B256; 6]);

impl InputVector {
    pub const LEN: usize = 6 * 32;

    pub fn from_child(parent_hash: B256, child: &Header) -> Self {
        Self([
            parent_hash,
            child.transactions_root,
            B256::left_padding_from(child.beneficiary.as_slice()),
            child.ommers_hash,
            U256::from(child.gas_limit).into(),
            U256::from(child.timestamp).into(),
        ])
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|word| word.0).collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(OracleError::decode(
                "input vector",
                format!("{} bytes, expected {}", bytes.len(), Self::LEN),
            ));
        }
        let mut words = [B256::ZERO; 6];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(32)) {
            *word = B256::from_slice(chunk);
        }
        Ok(Self(words))
    }

    pub fn hash(&self) -> B256 {
        keccak256(self.to_bytes())
    }

    pub fn parent_hash(&self) -> B256 {
        self.0[0]
    }

    pub fn tx_root(&self) -> B256 {
        self.0[1]
    }

    pub fn coinbase(&self) -> Result<Address> {
        let word = self.0[2];
        if word[..12].iter().any(|b| *b != 0) {
            return Err(OracleError::decode("coinbase", format!("{word} is not an address")));
        }
        Ok(Address::from_slice(&word[12..]))
    }

    pub fn uncle_hash(&self) -> B256 {
        self.0[3]
    }

    pub fn gas_limit(&self) -> Result<u64> {
        word_to_u64("gas limit", self.0[4])
    }

    pub fn timestamp(&self) -> Result<u64> {
        word_to_u64("timestamp", self.0[5])
    }
}

fn word_to_u64(what: &'static str, word: B256) -> Result<u64> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(OracleError::decode(what, format!("{word} overflows 64 bits")));
    }
    let mut be = [0u8; 8];
    be.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(be))
}

/// `[state_root, receipts_root]` of the child block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputVector(pub [B256; 2]);

impl OutputVector {
    pub const LEN: usize = 2 * 32;

    pub fn from_child(child: &Header) -> Self {
        Self([child.state_root, child.receipts_root])
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|word| word.0).collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(OracleError::decode(
                "output vector",
                format!("{} bytes, expected {}", bytes.len(), Self::LEN),
            ));
        }
        Ok(Self([B256::from_slice(&bytes[..32]), B256::from_slice(&bytes[32..])]))
    }

    pub fn state_root(&self) -> B256 {
        self.0[0]
    }

    pub fn receipts_root(&self) -> B256 {
        self.0[1]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    pub input_hash: B256,
    pub inputs: InputVector,
    pub outputs: OutputVector,
}

impl Commitment {
    pub fn new(parent_hash: B256, child: &Header) -> Self {
        let inputs = InputVector::from_child(parent_hash, child);
        Self {
            input_hash: inputs.hash(),
            inputs,
            outputs: OutputVector::from_child(child),
        }
    }

    /// Makes the input vector readable by its hash.
    pub fn seed(&self, store: &PreimageStore) -> Result<()> {
        store.put(self.input_hash, self.inputs.to_bytes())
    }

    /// Writes `<dir>/input` (the input hash) and `<dir>/output` (the two
    /// output roots).
    ///
    /// Both files are staged first. If `output` can't be put in place, the
    /// new `input` is removed again, so the directory never holds half a
    /// commitment from this call.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| OracleError::cache_io(dir, e))?;
        let input = dir.join(INPUT_FILE);
        let output = dir.join(OUTPUT_FILE);

        let staged_input = stage(&input, self.input_hash.as_slice())?;
        let staged_output = match stage(&output, &self.outputs.to_bytes()) {
            Ok(path) => path,
            Err(e) => {
                discard(&staged_input);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&staged_input, &input) {
            discard(&staged_input);
            discard(&staged_output);
            return Err(OracleError::cache_io(input, e));
        }
        if let Err(e) = fs::rename(&staged_output, &output) {
            discard(&input);
            discard(&staged_output);
            return Err(OracleError::cache_io(output, e));
        }
        debug!(dir = %dir.display(), input = %self.input_hash, "wrote commitment");
        Ok(())
    }

    /// Loads the input hash and output vector written by [`Commitment::write`].
    pub fn read(dir: &Path) -> Result<(B256, OutputVector)> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read(&path).map_err(|e| OracleError::cache_io(path, e))
        };
        let input = read(INPUT_FILE)?;
        if input.len() != 32 {
            return Err(OracleError::decode(
                "input hash",
                format!("{} bytes, expected 32", input.len()),
            ));
        }
        Ok((B256::from_slice(&input), OutputVector::from_bytes(&read(OUTPUT_FILE)?)?))
    }

    /// Compares a replay's roots with the committed output, receipts first.
    pub fn check_output(&self, state_root: B256, receipts_root: B256) -> Result<()> {
        check_root(OutputKind::ReceiptsRoot, self.outputs.receipts_root(), receipts_root)?;
        check_root(OutputKind::StateRoot, self.outputs.state_root(), state_root)
    }
}

fn check_root(kind: OutputKind, expected: B256, actual: B256) -> Result<()> {
    if expected != actual {
        error!(%kind, %expected, %actual, "replay disagrees with the committed output");
        return Err(OracleError::OutputMismatch {
            kind,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Writes `bytes` next to `path` under a temporary name, returning that name.
fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let staged = path.with_extension("tmp");
    write_with_retries(&staged, bytes)?;
    Ok(staged)
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), %e, "couldn't remove commitment file");
    }
}

fn write_with_retries(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut attempt = 1;
    loop {
        match fs::write(path, bytes) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < WRITE_ATTEMPTS => {
                warn!(path = %path.display(), %e, attempt, "commitment write failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(OracleError::cache_io(path, e)),
        }
    }
}

//! Fetches a parent/child block pair, checks that the child really follows
//! the parent, and commits to the transition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::consensus::Header;
use alloy::primitives::{keccak256, B256};
use alloy::providers::network::{eip2718::Encodable2718, Ethereum, Network};
use alloy::rpc::types::Transaction;
use eth_trie::{EthTrie, MemoryDB, Trie, TrieError};
use tracing::{debug, error, info};

use crate::commitment::Commitment;
use crate::error::{OracleError, Result, RootKind};
use crate::header::{encode_header, encode_header_list};
use crate::rpc::{ProofClient, RpcTransport};
use crate::store::PreimageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    /// The block the transition starts from.
    Parent,
    /// The block being committed to.
    Child,
}

pub struct BlockAssembler<T> {
    client: Arc<ProofClient<T>>,
    run_dir: PathBuf,
    start_hash: Option<B256>,
}

impl<T> BlockAssembler<T>
where
    T: RpcTransport,
{
    pub fn new(client: Arc<ProofClient<T>>, run_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            run_dir: run_dir.into(),
            start_hash: None,
        }
    }

    pub fn client(&self) -> &Arc<ProofClient<T>> {
        &self.client
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Hash of the first parent block fetched, which every child must link
    /// to.
    pub fn start_hash(&self) -> Option<B256> {
        self.start_hash
    }

    /// Verifies the transition from block `parent` to `parent + 1` and
    /// persists its commitment.
    pub async fn assemble_transition(&mut self, parent: u64) -> Result<Commitment> {
        let child = parent
            .checked_add(1)
            .ok_or_else(|| OracleError::decode("block number", format!("{parent} has no child")))?;
        self.fetch_parent(parent).await?;
        self.fetch_child(child).await
    }

    /// Runs one half of [`BlockAssembler::assemble_transition`]. Only a child
    /// produces a commitment.
    pub async fn prefetch_block(
        &mut self,
        number: u64,
        role: BlockRole,
    ) -> Result<Option<Commitment>> {
        match role {
            BlockRole::Parent => self.fetch_parent(number).await.map(|()| None),
            BlockRole::Child => self.fetch_child(number).await.map(Some),
        }
    }

    fn store(&self) -> &PreimageStore {
        self.client.store()
    }

    async fn fetch_parent(&mut self, number: u64) -> Result<()> {
        let block = self.client.get_block_by_number(number).await?;
        let header = block.header.verify()?;
        let hash = block.header.hash;
        self.store().put(hash, encode_header(&header))?;

        match self.start_hash {
            None => self.start_hash = Some(hash),
            Some(start) if start != hash => {
                debug!(number, %hash, %start, "keeping the first parent hash");
            }
            Some(_) => {}
        }
        info!(number, %hash, "fetched parent header");
        Ok(())
    }

    async fn fetch_child(&self, number: u64) -> Result<Commitment> {
        let block = self.client.get_block_by_number(number).await?;
        let child = block.header.verify()?;
        let hash = block.header.hash;

        let parent_hash = self.start_hash.unwrap_or_default();
        if child.parent_hash != parent_hash {
            error!(number, expected = %parent_hash, actual = %child.parent_hash, "block doesn't extend the parent");
            return Err(OracleError::LinkageMismatch {
                expected: parent_hash,
                actual: child.parent_hash,
            });
        }

        let transactions = encode_transactions(&block.transactions)?;
        verify_transactions_root(child.transactions_root, &transactions)?;
        for tx in transactions {
            self.store().insert(tx)?;
        }

        self.fetch_uncles(hash, child.ommers_hash).await?;
        self.store().put(hash, encode_header(&child))?;

        let commitment = Commitment::new(parent_hash, &child);
        commitment.seed(self.store())?;
        commitment.write(&self.run_dir)?;
        info!(
            number,
            %hash,
            txs = block.transactions.len(),
            input = %commitment.input_hash,
            state_root = %commitment.outputs.state_root(),
            receipts_root = %commitment.outputs.receipts_root(),
            "committed block transition"
        );
        Ok(commitment)
    }

    /// Fetches every uncle of `block_hash`, checks the list against
    /// `uncle_hash` and stores its encoding.
    async fn fetch_uncles(&self, block_hash: B256, uncle_hash: B256) -> Result<()> {
        let count = self.client.get_uncle_count(block_hash).await?;
        let mut uncles = Vec::<Header>::new();
        for index in 0..count {
            let uncle = self.client.get_uncle(block_hash, index).await?;
            uncles.push(uncle.verify()?);
        }

        let encoded = encode_header_list(&uncles);
        check_root(RootKind::Uncles, uncle_hash, keccak256(&encoded))?;
        self.store().put(uncle_hash, encoded)?;
        debug!(%block_hash, count, "fetched uncles");
        Ok(())
    }
}

/// The EIP-2718 encoding of every transaction, in block order.
pub fn encode_transactions(transactions: &[Transaction]) -> Result<Vec<Vec<u8>>> {
    transactions
        .iter()
        .map(|tx| {
            <Ethereum as Network>::TxEnvelope::try_from(tx.clone())
                .map(|envelope| envelope.encoded_2718())
                .map_err(|e| OracleError::decode("transaction", e))
        })
        .collect()
}

/// Root of the trie mapping `rlp(i)` to the `i`th encoded transaction.
pub fn transactions_root<T: AsRef<[u8]>>(encoded: &[T]) -> Result<B256> {
    let trie_error = |e: TrieError| OracleError::decode("transactions trie", format!("{e:?}"));

    let mut trie = EthTrie::new(Arc::new(MemoryDB::new(true)));
    for (ix, tx) in encoded.iter().enumerate() {
        trie.insert(&alloy::rlp::encode(ix), tx.as_ref())
            .map_err(trie_error)?;
    }
    Ok(B256::from(trie.root_hash().map_err(trie_error)?.0))
}

/// Checks that the encoded transactions hash to `tx_root`.
pub fn verify_transactions_root<T: AsRef<[u8]>>(tx_root: B256, encoded: &[T]) -> Result<()> {
    check_root(RootKind::Transactions, tx_root, transactions_root(encoded)?)
}

fn check_root(kind: RootKind, expected: B256, actual: B256) -> Result<()> {
    if expected != actual {
        error!(%kind, %expected, %actual, "root mismatch");
        return Err(OracleError::RootMismatch {
            kind,
            expected,
            actual,
        });
    }
    Ok(())
}

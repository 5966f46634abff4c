use alloy::primitives::{b256, B256};

/// The hash of an empty Merkle Patricia trie.
/// 0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421
pub const EMPTY_TRIE_HASH: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// The hash of an RLP-encoded empty list, i.e. the uncle hash of a block
/// without uncles.
/// 0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347
pub const EMPTY_LIST_HASH: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

/// Node queried when `NODE` is not set.
pub const DEFAULT_NODE_URL: &str = "https://ethereum-rpc.publicnode.com";

/// Root of the per-block working directories when `BASEDIR` is not set.
pub const DEFAULT_BASE_DIR: &str = "/tmp/cannon";

/// Name of the working directory of the transition starting at
/// `block_number`, relative to the base directory.
pub fn run_dir_name(block_number: u64) -> String {
    format!("0_{block_number}")
}

#[test]
fn test_empty_trie_hash() {
    assert_eq!(
        EMPTY_TRIE_HASH,
        alloy::primitives::keccak256([alloy::rlp::EMPTY_STRING_CODE])
    );
}

#[test]
fn test_empty_list_hash() {
    assert_eq!(
        EMPTY_LIST_HASH,
        alloy::primitives::keccak256([alloy::rlp::EMPTY_LIST_CODE])
    );
}

#[test]
fn test_run_dir_name() {
    assert_eq!(run_dir_name(13284469), "0_13284469");
}

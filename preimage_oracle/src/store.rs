//! The content-addressed preimage store.
//!
//! Every value is keyed by its own keccak256 hash. The oracle pipeline is the
//! only writer; the replay path reads back by hash and has no fallback, so a
//! miss is fatal.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use alloy::primitives::{keccak256, Bytes, B256};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{OracleError, Result};

/// In-memory map from hash to preimage, optionally mirrored to a directory.
#[derive(Debug, Default)]
pub struct PreimageStore {
    preimages: RwLock<HashMap<B256, Bytes>>,
    disk: Option<PathBuf>,
}

impl PreimageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that writes every new preimage to `<dir>/0x<hash>` and reads
    /// that file back on an in-memory miss.
    pub fn with_disk(dir: impl Into<PathBuf>) -> Self {
        Self {
            preimages: RwLock::default(),
            disk: Some(dir.into()),
        }
    }

    /// Stores `value`, returning its hash.
    pub fn insert(&self, value: impl Into<Bytes>) -> Result<B256> {
        let value = value.into();
        let hash = keccak256(&value);
        self.put(hash, value)?;
        Ok(hash)
    }

    /// Stores `value` under `hash`.
    ///
    /// Storing an identical pair again is a no-op. A value whose hash is not
    /// `hash`, or a different value under an existing key, is rejected.
    pub fn put(&self, hash: B256, value: impl Into<Bytes>) -> Result<()> {
        let value = value.into();
        let actual = keccak256(&value);
        if actual != hash {
            return Err(OracleError::PreimageHashMismatch {
                expected: hash,
                actual,
            });
        }

        {
            let mut preimages = self.preimages.write();
            match preimages.get(&hash) {
                Some(existing) if *existing == value => return Ok(()),
                Some(_) => return Err(OracleError::PreimageConflict { hash }),
                None => {
                    preimages.insert(hash, value.clone());
                }
            }
        }

        if let Some(dir) = &self.disk {
            let path = preimage_path(dir, &hash);
            if let Err(source) = fs::write(&path, &value) {
                warn!(path = %path.display(), %source, "couldn't mirror preimage to disk");
            }
        }
        Ok(())
    }

    /// Looks up the preimage of `hash`.
    pub fn get(&self, hash: &B256) -> Result<Bytes> {
        if let Some(value) = self.preimages.read().get(hash) {
            return Ok(value.clone());
        }

        let value = self
            .load_from_disk(hash)?
            .ok_or(OracleError::MissingPreimage { hash: *hash })?;
        self.preimages.write().insert(*hash, value.clone());
        Ok(value)
    }

    pub fn contains(&self, hash: &B256) -> bool {
        self.preimages.read().contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.preimages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.preimages.read().is_empty()
    }

    fn load_from_disk(&self, hash: &B256) -> Result<Option<Bytes>> {
        let Some(dir) = &self.disk else {
            return Ok(None);
        };
        let path = preimage_path(dir, hash);
        let value = match fs::read(&path) {
            Ok(value) => Bytes::from(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(OracleError::cache_io(path, e)),
        };
        if keccak256(&value) != *hash {
            warn!(path = %path.display(), "ignoring preimage file with wrong content");
            return Ok(None);
        }
        debug!(%hash, "preimage loaded from disk");
        Ok(Some(value))
    }
}

fn preimage_path(dir: &Path, hash: &B256) -> PathBuf {
    dir.join(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_values_hash_to_their_key() {
        let store = PreimageStore::new();
        for value in [vec![], b"a".to_vec(), vec![0xc0], vec![7u8; 100]] {
            let hash = store.insert(value).unwrap();
            assert_eq!(keccak256(store.get(&hash).unwrap()), hash);
        }
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn put_is_idempotent() {
        let store = PreimageStore::new();
        let hash = keccak256(b"node");
        store.put(hash, b"node".to_vec()).unwrap();
        store.put(hash, b"node".to_vec()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn mismatched_pair_reports_both_hashes() {
        let store = PreimageStore::new();
        let hash = keccak256(b"one");
        let err = store.put(hash, b"two".to_vec()).unwrap_err();
        assert!(matches!(
            err,
            OracleError::PreimageHashMismatch { expected, actual }
                if expected == hash && actual == keccak256(b"two")
        ));
        assert!(err.is_fatal());
        assert!(store.is_empty());
    }

    #[test]
    fn missing_preimage() {
        let store = PreimageStore::new();
        let hash = B256::repeat_byte(0x11);
        assert!(matches!(
            store.get(&hash),
            Err(OracleError::MissingPreimage { hash: h }) if h == hash
        ));
    }

    #[test]
    fn disk_mirror_survives_a_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let hash = PreimageStore::with_disk(dir.path())
            .insert(b"persisted".to_vec())
            .unwrap();
        assert!(dir.path().join(hash.to_string()).exists());

        let reopened = PreimageStore::with_disk(dir.path());
        assert!(!reopened.contains(&hash));
        assert_eq!(reopened.get(&hash).unwrap(), Bytes::from_static(b"persisted"));
        assert!(reopened.contains(&hash));
    }

    #[test]
    fn corrupted_disk_file_is_not_served() {
        let dir = tempfile::tempdir().unwrap();
        let hash = keccak256(b"expected");
        fs::write(dir.path().join(hash.to_string()), b"tampered").unwrap();
        let store = PreimageStore::with_disk(dir.path());
        assert!(matches!(
            store.get(&hash),
            Err(OracleError::MissingPreimage { .. })
        ));
    }
}

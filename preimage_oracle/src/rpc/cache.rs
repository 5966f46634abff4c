use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use alloy::primitives::B256;
use tracing::warn;

use crate::error::{OracleError, Result};

/// Raw JSON-RPC responses on disk, keyed by the keccak256 of the request
/// body.
///
/// Entries are never invalidated: a run directory belongs to one block and
/// everything it caches is immutable chain data.
#[derive(Debug, Clone)]
pub struct RequestCache {
    dir: PathBuf,
}

impl RequestCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &B256) -> PathBuf {
        self.dir.join(format!("json_{key}"))
    }

    /// The cached body for `key`, if there is a readable one.
    pub fn read(&self, key: &B256) -> Option<Vec<u8>> {
        let path = self.path(key);
        match fs::read(&path) {
            Ok(body) => Some(body),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), %e, "unreadable cache entry, treating as a miss");
                None
            }
        }
    }

    pub fn write(&self, key: &B256, body: &[u8]) -> Result<()> {
        let path = self.path(key);
        fs::create_dir_all(&self.dir)
            .and_then(|()| fs::write(&path, body))
            .map_err(|e| OracleError::cache_io(path, e))
    }
}

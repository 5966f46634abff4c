use std::path::PathBuf;
use std::time::Duration;

use alloy::transports::http::reqwest::Url;
use cannon_common::run_dir_name;

use crate::rpc::{HttpTransport, RetryPolicy, RetryTransport, TransportError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Where to fetch from, where to keep results, and how hard to try.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub node_url: Url,
    pub base_dir: PathBuf,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl OracleConfig {
    pub fn new(node_url: Url, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            node_url,
            base_dir: base_dir.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    /// The working directory for the transition starting at `block_number`.
    pub fn run_dir(&self, block_number: u64) -> PathBuf {
        self.base_dir.join(run_dir_name(block_number))
    }

    pub fn transport(&self) -> Result<RetryTransport<HttpTransport>, TransportError> {
        Ok(RetryTransport::new(
            HttpTransport::new(self.node_url.clone(), self.timeout)?,
            RetryPolicy::new(self.backoff, self.max_retries),
        ))
    }
}

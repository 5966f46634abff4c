use std::future::Future;
use std::pin::Pin;

use tokio::time::Duration;
use tracing::warn;

use super::transport::{RpcTransport, TransportError};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    backoff: Duration,
    retries: u32,
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(backoff: Duration, max_retries: u32) -> Self {
        Self {
            backoff,
            retries: 0,
            max_retries,
        }
    }

    pub fn backoff(&self) -> tokio::time::Sleep {
        tokio::time::sleep(self.backoff)
    }

    /// The policy to use for the next attempt, if `result` is worth
    /// retrying.
    ///
    /// Only transport failures are retried. A response that arrived, even a
    /// JSON-RPC error envelope, is final.
    fn retry<T>(
        &self,
        result: Result<&T, &TransportError>,
    ) -> Option<Pin<Box<dyn Future<Output = Self> + Send + 'static>>> {
        match result {
            Err(err) if self.retries < self.max_retries => {
                warn!(%err, attempt = self.retries + 1, max_retries = self.max_retries, "retrying request");
                let mut policy = self.clone();
                Some(Box::pin(async move {
                    policy.backoff().await;
                    policy.retries += 1;
                    policy
                }))
            }
            _ => None,
        }
    }
}

/// Retries the wrapped transport according to a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryTransport<T> {
    pub const fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T> RpcTransport for RetryTransport<T>
where
    T: RpcTransport + Sync,
{
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let mut policy = self.policy.clone();
        let mut res = self.inner.post(body.clone()).await;

        while let Some(new_policy) = policy.retry(res.as_ref()) {
            policy = new_policy.await;
            res = self.inner.post(body.clone()).await;
        }

        res
    }
}

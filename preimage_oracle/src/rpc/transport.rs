use std::future::Future;
use std::time::Duration;

use alloy::transports::http::reqwest::{header::CONTENT_TYPE, Client, Url};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http: {0}")]
    Http(#[from] alloy::transports::http::reqwest::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// Sends a JSON-RPC request body and returns the raw response body.
pub trait RpcTransport {
    fn post(&self, body: Vec<u8>) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

/// POSTs to a node over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            client: Client::builder().build()?,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl RpcTransport for HttpTransport {
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let request = async {
            let response = self
                .client
                .post(self.url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, TransportError>(response.bytes().await?.to_vec())
        };
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

//! Runs a block build on its own thread so the caller can keep serving
//! requests, and lets any number of observers ask for the result or cancel
//! the build.
//!
//! The build function receives an abort signal that it should poll between
//! steps. However many times [`BlockBuilder::stop`] is called, and from
//! however many threads, the build resolves exactly once and every observer
//! sees that same result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

/// The error a build failed with, shared by every observer.
#[derive(Debug, Clone, Error)]
#[error("{0:#}")]
pub struct BuildError(Arc<anyhow::Error>);

impl BuildError {
    fn abandoned() -> Self {
        anyhow::anyhow!("block builder exited without producing a result").into()
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for BuildError {
    fn from(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}

pub type BuildResult<B> = Result<Arc<B>, BuildError>;

/// Handle to a build running on a worker thread.
pub struct BlockBuilder<B> {
    abort_signal: Arc<AtomicBool>,
    result: watch::Receiver<Option<BuildResult<B>>>,
}

impl<B> BlockBuilder<B>
where
    B: Send + Sync + 'static,
{
    /// Spawns `build(params, abort_signal)` on a new thread.
    pub fn start<P, F>(build: F, params: P) -> Self
    where
        P: Send + 'static,
        F: FnOnce(P, Arc<AtomicBool>) -> anyhow::Result<B> + Send + 'static,
    {
        let abort_signal = Arc::new(AtomicBool::new(false));
        let (tx, result) = watch::channel(None);

        let signal = abort_signal.clone();
        thread::spawn(move || {
            info!("building block");
            let start = Instant::now();
            let outcome = build(params, signal);
            match &outcome {
                Ok(_) => info!(elapsed = ?start.elapsed(), "built block"),
                Err(err) => warn!(elapsed = ?start.elapsed(), "failed to build block: {err:#}"),
            }
            tx.send_replace(Some(outcome.map(Arc::new).map_err(BuildError::from)));
        });

        Self {
            abort_signal,
            result,
        }
    }

    /// The result, if the build has finished.
    pub fn peek(&self) -> Option<BuildResult<B>> {
        self.result.borrow().clone()
    }

    /// Asks the build to stop and waits for its result, which may still be a
    /// finished block if the build completed first.
    pub async fn stop(&self) -> BuildResult<B> {
        self.abort_signal.store(true, Ordering::Relaxed);
        self.wait().await
    }

    /// Waits for the build to finish on its own.
    pub async fn wait(&self) -> BuildResult<B> {
        let mut result = self.result.clone();
        let outcome = result
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|outcome| outcome.clone());
        outcome.unwrap_or_else(|| Err(BuildError::abandoned()))
    }

    pub fn stop_blocking(&self) -> BuildResult<B> {
        futures::executor::block_on(self.stop())
    }

    pub fn wait_blocking(&self) -> BuildResult<B> {
        futures::executor::block_on(self.wait())
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_signal.load(Ordering::Relaxed)
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use block_builder::BlockBuilder;
use cannon::env::load_dotenvy_vars_if_present;
use clap::Parser;
use preimage_oracle::{
    replay, BlockAssembler, OracleConfig, PreimageStore, ProofClient, RequestCache,
};
use tracing::{info, warn};

#[path = "cannon/cli.rs"]
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = load_dotenvy_vars_if_present();
    cannon::tracing::init();
    match dotenv {
        Ok(Some(path)) => info!(path = %path.display(), "loaded .env"),
        Ok(None) => {}
        Err(e) => warn!("Found local `.env` file but was unable to parse it! (err: {e})"),
    }

    let args = cli::Cli::parse();
    if let Some(path) = &args.cpu_profile {
        warn!(path = %path.display(), "CPU profiling is not supported, ignoring");
    }

    let config = OracleConfig::new(args.node_url, args.base_dir)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_retries(args.max_retries, Duration::from_millis(args.backoff));
    let run_dir = config.run_dir(args.block_number);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating run directory {}", run_dir.display()))?;
    info!(
        block_number = args.block_number,
        node = %config.node_url,
        run_dir = %run_dir.display(),
        "preparing block transition"
    );

    let store = Arc::new(PreimageStore::with_disk(&run_dir));
    let client = ProofClient::new(
        config.transport().context("building the HTTP client")?,
        RequestCache::new(&run_dir),
        store.clone(),
    );
    let mut assembler = BlockAssembler::new(Arc::new(client), &run_dir);
    let commitment = assembler.assemble_transition(args.block_number).await?;
    info!(
        input_hash = %commitment.input_hash,
        state_root = %commitment.outputs.state_root(),
        receipts_root = %commitment.outputs.receipts_root(),
        preimages = store.len(),
        "transition committed"
    );

    let builder = BlockBuilder::start(
        move |input_hash, abort_signal| {
            Ok(replay::rebuild_block(&store, input_hash, Some(abort_signal))?)
        },
        commitment.input_hash,
    );
    let template = builder.wait().await?;
    info!(
        number = template.header.number,
        parent_hash = %template.header.parent_hash,
        coinbase = %template.header.coinbase,
        gas_limit = template.header.gas_limit,
        timestamp = template.header.timestamp,
        base_fee = ?template.header.base_fee_per_gas,
        uncles = template.uncles.len(),
        "rebuilt child block template"
    );

    Ok(())
}

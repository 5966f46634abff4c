use std::path::PathBuf;

use alloy::transports::http::reqwest::Url;
use cannon_common::{DEFAULT_BASE_DIR, DEFAULT_NODE_URL};
use clap::{Parser, ValueHint};

const RPC_HELP_HEADING: &str = "Node options";

/// Fetches and commits to the transition from BLOCK_NUMBER to the next
/// block, then rebuilds the child block template from the committed
/// preimages alone.
#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct Cli {
    /// The parent block of the transition.
    pub(crate) block_number: u64,

    /// Accepted for compatibility; profiling is not supported.
    #[arg(value_hint = ValueHint::FilePath)]
    pub(crate) cpu_profile: Option<PathBuf>,

    /// The node JSON-RPC URL.
    #[arg(long, env = "NODE", default_value = DEFAULT_NODE_URL, value_hint = ValueHint::Url, help_heading = RPC_HELP_HEADING)]
    pub(crate) node_url: Url,

    /// Directory holding one working directory per transition.
    #[arg(long, env = "BASEDIR", default_value = DEFAULT_BASE_DIR, value_hint = ValueHint::DirPath)]
    pub(crate) base_dir: PathBuf,

    /// Retries of a failed request before giving up.
    #[arg(long, env = "CANNON_MAX_RETRIES", default_value_t = 3, help_heading = RPC_HELP_HEADING)]
    pub(crate) max_retries: u32,

    /// Milliseconds to wait between retries.
    #[arg(long, env = "CANNON_BACKOFF", default_value_t = 500, help_heading = RPC_HELP_HEADING)]
    pub(crate) backoff: u64,

    /// Seconds to wait for a single response.
    #[arg(long, env = "CANNON_TIMEOUT", default_value_t = 30, help_heading = RPC_HELP_HEADING)]
    pub(crate) timeout: u64,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn block_number_is_positional() {
        let cli = Cli::try_parse_from(["cannon", "13284469", "/tmp/cpu.prof", "--timeout", "5"])
            .unwrap();
        assert_eq!(cli.block_number, 13284469);
        assert_eq!(cli.cpu_profile, Some(PathBuf::from("/tmp/cpu.prof")));
        assert_eq!(cli.timeout, 5);
    }
}

//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Default resolve budget in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Build a flattened bill of materials from a part URL.
///
/// Partlist fetches the part page at URL, expands assemblies into their
/// sub-parts and prints one line per distinct part with totals.
#[derive(Parser, Debug)]
#[command(name = "partlist")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the root part
    pub url: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Seconds to spend resolving before reporting a partial BOM
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub timeout_secs: Option<u64>,

    /// Maximum number of distinct parts (0 for unlimited)
    #[arg(short = 'm', long)]
    pub max_parts: Option<usize>,

    /// Row steps resolved at once within a pass (1-64)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub concurrency: Option<u8>,

    /// Always fetch from the network instead of the content cache
    #[arg(long)]
    pub no_cache: bool,

    /// Accept invalid TLS certificates (disables certificate verification)
    #[arg(long)]
    pub insecure: bool,

    /// Raw Cookie header sent with every request
    #[arg(long, value_name = "STR")]
    pub cookies: Option<String>,

    /// Basic-auth user name
    #[arg(long, requires = "password")]
    pub user: Option<String>,

    /// Basic-auth password
    #[arg(long, requires = "user")]
    pub password: Option<String>,

    /// Print the BOM as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file path (default: $XDG_CONFIG_HOME/partlist/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

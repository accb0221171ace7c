use std::path::PathBuf;

use clap::Parser;

/// ramdb: an in-memory key/value store with a write-ahead log.
#[derive(Debug, Parser)]
#[command(name = "ramdb-server", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file. Defaults are used for anything
    /// not set there or via `RAMDB_*` environment variables.
    #[arg(long, short = 'c', env = "RAMDB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides `log.level` regardless of config file or environment.
    #[arg(long)]
    pub log_level: Option<String>,
}

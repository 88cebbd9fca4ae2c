// CLI module for glyphcache
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// glyphcache - generational LRU+TTL cache for procedural image assets
#[derive(Parser, Debug)]
#[command(name = "glyphcache", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (defaults to ~/.glyphcache/config.toml when present)
    #[arg(short, long, env = "GLYPHCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

mod collectors;
mod config;
mod daemon;
mod models;
mod sensors;

use anyhow::Result;
use clap::Parser;
use sensors::SensorRegistry;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mdsensord",
    about = "ksysguardd-compatible MD-RAID health sensor backend",
    version
)]
struct Cli {
    /// Path of the RAID status file to monitor (default: /proc/mdstat,
    /// or general.mdstat_path from the config file)
    #[arg(long, value_name = "PATH")]
    mdstat: Option<PathBuf>,

    /// Suppress warnings about unparseable mdstat content
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout is the protocol channel; all diagnostics go to stderr.
    let default_level = if cli.quiet { "error" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let cfg = config::Config::load();
    let source = cli.mdstat.unwrap_or(cfg.general.mdstat_path);

    let registry = SensorRegistry::new(source);
    let stdin = io::stdin();
    daemon::run(&registry, stdin.lock(), io::stdout())
}

use std::path::PathBuf;

use anyhow::Result;
use arp::Daemon;
use clap::Parser;

use crate::config::Config;

mod config;

#[derive(Debug, Parser)]
#[command(name = "xarpd", about = "User-space ARP daemon")]
pub struct Cli {
    /// Interfaces the daemon takes ownership of
    #[arg(value_name = "INTERFACE")]
    pub interfaces: Vec<String>,

    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut interfaces = config.interfaces;
    interfaces.extend(cli.interfaces);

    let mut daemon = Daemon::new(config.port, config.default_ttl, interfaces);

    Ok(daemon.run()?)
}

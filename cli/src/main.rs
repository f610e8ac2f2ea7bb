mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{cluster, load, overlay, regions, search};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let level = match verbose { 0 => "warn", 1 => "info", 2 => "debug", _ => "trace" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("geonav={level},geonav_cli={level}")));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

pub async fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Regions(args) => regions::run(&cli, args),
        Commands::Load(args) => load::run(&cli, args).await,
        Commands::Cluster(args) => cluster::run(&cli, args),
        Commands::Overlay(args) => overlay::run(&cli, args).await,
        Commands::Search(args) => search::run(&cli, args).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> { run().await }

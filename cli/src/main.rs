mod cli;
mod commands;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{checks, run, scores};

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match &cli.command {
        Commands::Checks(args) => checks::run(&cli, args),
        Commands::Scores(args) => scores::run(&cli, args),
        Commands::Run(args) => run::run(&cli, args),
    }
}

fn main() -> Result<()> { run() }

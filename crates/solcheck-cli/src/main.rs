use std::error::Error;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{
    blocks::{self, BlocksArgs},
    normalize::{self, NormalizeArgs},
    verify::{self, VerifyArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "solcheck", about = "Verify machine-generated math exercise solutions")]
struct Cli {
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "warn")]
    log: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a solution and print the report as JSON.
    Verify(VerifyArgs),
    /// Normalize a solution and print the result with the applied fixes.
    Normalize(NormalizeArgs),
    /// Print the heading blocks extracted from a solution file.
    Blocks(BlocksArgs),
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    match cli.command {
        Command::Verify(args) => verify::run(&args),
        Command::Normalize(args) => normalize::run(&args).map(|()| ExitCode::SUCCESS),
        Command::Blocks(args) => blocks::run(&args).map(|()| ExitCode::SUCCESS),
    }
}

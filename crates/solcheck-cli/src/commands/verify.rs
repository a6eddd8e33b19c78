use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use solcheck_core::Policy;
use solcheck_verify::{verify, verify_normalized};
use tracing::info;

use super::{print_json, read_text};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Free-text topic hint, e.g. "Dérivées".
    #[arg(long, default_value = "")]
    pub topic: String,
    /// File holding the exercise statement.
    #[arg(long)]
    pub statement: PathBuf,
    /// File holding the solution text with its headings.
    #[arg(long)]
    pub solution: PathBuf,
    /// YAML policy overriding the default tolerances.
    #[arg(long)]
    pub policy: Option<PathBuf>,
    /// Seed for the sampling checks; overrides the policy seed.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Normalize the input before verifying it.
    #[arg(long)]
    pub autofix: bool,
}

pub fn run(args: &VerifyArgs) -> Result<ExitCode, Box<dyn Error>> {
    let mut policy = match &args.policy {
        Some(path) => Policy::from_yaml_path(path)?,
        None => Policy::default(),
    };
    if let Some(seed) = args.seed {
        policy.seed = seed;
    }
    let statement = read_text(&args.statement)?;
    let solution = read_text(&args.solution)?;

    let report = if args.autofix {
        verify_normalized(&args.topic, &statement, &solution, &policy)
    } else {
        verify(&args.topic, &statement, &solution, &policy)
    };
    info!(ok = report.ok(), items = report.items().len(), "verification done");
    print_json(&report)?;
    Ok(if report.ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

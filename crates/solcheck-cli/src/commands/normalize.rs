use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use solcheck_core::Policy;
use solcheck_verify::normalize;

use super::{print_json, read_text};

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// File holding the exercise statement.
    #[arg(long)]
    pub statement: PathBuf,
    /// File holding the raw solution text.
    #[arg(long)]
    pub solution: PathBuf,
    /// YAML policy providing the padding threshold and clause.
    #[arg(long)]
    pub policy: Option<PathBuf>,
}

pub fn run(args: &NormalizeArgs) -> Result<(), Box<dyn Error>> {
    let policy = match &args.policy {
        Some(path) => Policy::from_yaml_path(path)?,
        None => Policy::default(),
    };
    let statement = read_text(&args.statement)?;
    let solution = read_text(&args.solution)?;
    print_json(&normalize(&statement, &solution, &policy))
}

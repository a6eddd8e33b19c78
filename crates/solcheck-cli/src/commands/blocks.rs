use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use solcheck_verify::extract_blocks;

use super::{print_json, read_text};

#[derive(Args, Debug)]
pub struct BlocksArgs {
    /// Solution file to split.
    pub file: PathBuf,
}

pub fn run(args: &BlocksArgs) -> Result<(), Box<dyn Error>> {
    let text = read_text(&args.file)?;
    let blocks: BTreeMap<&str, String> = extract_blocks(&text)
        .into_iter()
        .map(|(heading, content)| (heading.token(), content))
        .collect();
    if blocks.is_empty() {
        tracing::warn!(file = %args.file.display(), "fewer than two headings found");
    }
    print_json(&blocks)
}

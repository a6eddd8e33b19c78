pub mod blocks;
pub mod normalize;
pub mod verify;

use std::error::Error;
use std::fs;
use std::path::Path;

pub(crate) fn read_text(path: &Path) -> Result<String, Box<dyn Error>> {
    fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()).into())
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

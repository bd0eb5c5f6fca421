//! Expand command - print the wire record for a configuration

use miette::IntoDiagnostic;
use std::path::Path;

use crate::commands::load_config;
use crate::error::Result;

pub fn run(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let record = edgectl_core::expand(&config)?;
    let json = record.to_json_pretty().into_diagnostic()?;
    println!("{json}");
    Ok(())
}

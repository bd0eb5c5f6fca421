//! Flatten command - print the declarative configuration for a wire record

use edgectl_core::DistributionRecord;
use miette::{IntoDiagnostic, WrapErr};
use std::path::Path;

use crate::error::Result;

pub fn run(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let record = DistributionRecord::from_json(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to parse record from {}", path.display()))?;

    let yaml = edgectl_core::flatten(&record).to_yaml()?;
    print!("{yaml}");
    Ok(())
}

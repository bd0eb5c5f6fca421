//! Validate command - check a configuration offline

use console::style;
use miette::IntoDiagnostic;
use serde::Serialize;
use std::path::Path;

use crate::commands::load_config;
use crate::display::print_violations;
use crate::error::{CliError, Result};

#[derive(Serialize)]
struct ValidationOutput {
    valid: bool,
    file: String,
    errors: Vec<ViolationOutput>,
}

#[derive(Serialize)]
struct ViolationOutput {
    group: String,
    path: String,
    message: String,
}

pub fn run(path: &Path, json_output: bool) -> Result<()> {
    let config = load_config(path)?;
    let violations = edgectl_core::validate(&config);

    if json_output {
        let output = ValidationOutput {
            valid: violations.is_empty(),
            file: path.display().to_string(),
            errors: violations
                .iter()
                .map(|v| ViolationOutput {
                    group: v.group.to_string(),
                    path: v.path.clone(),
                    message: v.message.clone(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else if violations.is_empty() {
        println!(
            "{} {} is a valid distribution configuration",
            style("✓").green(),
            path.display()
        );
    } else {
        print_violations(&violations);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(CliError::validation_with_help(
            format!("{} problem(s) in {}", violations.len(), path.display()),
            "fix the fields listed above and run validate again",
        ))
    }
}

//! Apply command - create or update a distribution

use console::style;
use edgectl_control::{CreateOptions, UpdateOptions};
use miette::IntoDiagnostic;
use std::path::Path;
use std::time::Duration;

use crate::commands::{Connection, load_config};
use crate::display::print_handle;
use crate::error::Result;

pub async fn run(
    connection: &Connection,
    path: &Path,
    id: Option<&str>,
    wait: bool,
    timeout: Option<Duration>,
    json_output: bool,
) -> Result<()> {
    let config = load_config(path)?;
    let ctl = connection.controller()?;

    let current = match id {
        Some(id) => {
            let current = ctl.read(id).await?;
            if current.is_none() && !json_output {
                println!(
                    "{} Distribution {} no longer exists, creating a new one",
                    style("⚠").yellow(),
                    style(id).cyan()
                );
            }
            current
        }
        None => None,
    };

    let handle = match current {
        Some(current) => {
            if !json_output {
                println!(
                    "{} Updating distribution {}",
                    style("→").blue(),
                    style(&current.id).cyan()
                );
            }
            ctl.update(&current, &config, &UpdateOptions { wait, timeout })
                .await?
        }
        None => {
            if !json_output {
                println!("{} Creating distribution", style("→").blue());
            }
            ctl.create(&config, &CreateOptions { wait, timeout }).await?
        }
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&handle).into_diagnostic()?);
    } else {
        print_handle(&handle);
        println!("\n{} {}", style("✓").green(), handle.transitions);
    }
    Ok(())
}

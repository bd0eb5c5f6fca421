//! Status command - show the state of a distribution

use miette::IntoDiagnostic;

use crate::commands::Connection;
use crate::display::print_handle;
use crate::error::{CliError, Result};

pub async fn run(connection: &Connection, id: &str, output_json: bool) -> Result<()> {
    let ctl = connection.controller()?;
    let handle = ctl
        .read(id)
        .await?
        .ok_or_else(|| CliError::not_found(format!("distribution '{id}' not found")))?;

    if output_json {
        let json = serde_json::to_string_pretty(&handle).into_diagnostic()?;
        println!("{}", json);
        return Ok(());
    }

    print_handle(&handle);
    Ok(())
}

//! Delete command - delete or retain a distribution

use console::style;
use edgectl_control::{DeleteOptions, DeleteResult};
use std::time::Duration;

use crate::commands::Connection;
use crate::error::Result;

pub async fn run(
    connection: &Connection,
    id: &str,
    retain: bool,
    wait: bool,
    timeout: Option<Duration>,
) -> Result<()> {
    let ctl = connection.controller()?;

    // the handle carries the ETag the delete starts from
    let Some(handle) = ctl.read(id).await? else {
        println!(
            "{} Distribution {} is already gone",
            style("✓").green(),
            style(id).cyan()
        );
        return Ok(());
    };

    let verb = if retain { "Disabling" } else { "Deleting" };
    println!("{} {} distribution {}", style("→").blue(), verb, style(id).cyan());

    let options = DeleteOptions {
        retain,
        wait,
        timeout,
    };
    let outcome = ctl.delete(&handle, &options).await?;

    let summary = match outcome.result {
        DeleteResult::Deleted => "deleted",
        DeleteResult::Retained => "disabled and retained",
        DeleteResult::AlreadyAbsent => "already gone",
    };
    println!(
        "{} Distribution {} {} ({})",
        style("✓").green(),
        style(id).cyan(),
        summary,
        style(&outcome.transitions).dim()
    );
    Ok(())
}

//! Display formatting for CLI output

use console::style;
use edgectl_control::DistributionHandle;
use edgectl_core::{DistributionStatus, Violation};
use std::collections::BTreeMap;

/// Print violations grouped by the field group they belong to
pub fn print_violations(violations: &[Violation]) {
    let mut grouped: BTreeMap<String, Vec<&Violation>> = BTreeMap::new();
    for v in violations {
        grouped.entry(v.group.to_string()).or_default().push(v);
    }

    println!(
        "{} {} problem(s) found",
        style("✗").red().bold(),
        violations.len()
    );
    for (group, items) in grouped {
        println!("\n  {}", style(group).bold());
        for v in items {
            println!("    {} {}", style(&v.path).yellow(), v.message);
        }
    }
    println!();
}

pub fn print_handle(handle: &DistributionHandle) {
    println!("{}", style("DISTRIBUTION").bold().underlined());
    println!("  Id:          {}", style(&handle.id).cyan());
    println!("  ARN:         {}", handle.arn);
    println!("  Domain:      {}", handle.domain_name);
    println!("  Zone:        {}", handle.hosted_zone_id);

    let status = match handle.status {
        DistributionStatus::Deployed => style(handle.status.to_string()).green(),
        DistributionStatus::InProgress => style(handle.status.to_string()).yellow(),
    };
    println!("  Status:      {}", status);
    let enabled = if handle.config.enabled {
        style("yes").green()
    } else {
        style("no").dim()
    };
    println!("  Enabled:     {}", enabled);
    println!("  ETag:        {}", handle.etag);
    println!(
        "  Modified:    {}",
        handle.last_modified_time.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Reference:   {}", handle.caller_reference);

    if !handle.config.aliases.is_empty() {
        println!("\n{}", style("ALIASES").bold().underlined());
        for alias in &handle.config.aliases {
            println!("  {}", alias);
        }
    }

    println!("\n{}", style("ORIGINS").bold().underlined());
    for origin in &handle.config.origins {
        println!("  {} -> {}", style(&origin.origin_id).cyan(), origin.domain_name);
    }

    if !handle.tags.is_empty() {
        println!("\n{}", style("TAGS").bold().underlined());
        for (key, value) in &handle.tags {
            println!("  {}={}", key, value);
        }
    }

    if handle.in_progress_invalidation_batches > 0 {
        println!(
            "\n{} {} invalidation batch(es) in progress",
            style("⚠").yellow(),
            handle.in_progress_invalidation_batches
        );
    }
}

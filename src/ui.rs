//! Operator-facing output.

use console::style;

use crate::boundary::BoundaryWarning;
use crate::concat::ConcatResult;
use crate::release::{ReleasePlan, ReleaseRecord};

pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("WARNING:").yellow().bold(), warning);
}

pub fn display_warnings(warnings: &[BoundaryWarning]) {
    for warning in warnings {
        display_warning(warning);
    }
}

pub fn display_concat_result(result: &ConcatResult, destination: &std::path::Path) {
    display_success(&format!(
        "Wrote {} ({} bytes from {} file(s))",
        destination.display(),
        result.bytes,
        result.included.len()
    ));
}

pub fn display_tasks(tasks: &[(&str, &[String])]) {
    println!("{}", style("Available tasks:").bold());
    for (name, steps) in tasks {
        println!("  {:<8} {}", name, steps.join(" → "));
    }
    println!("  {:<8} test → watch", "dev");
    println!("  {:<8} build → bump → commit → tag → push", "release");
}

pub fn display_release_plan(plan: &ReleasePlan) {
    println!("\n{}", style("Release plan (dry run):").bold());
    println!(
        "  Version: {} → {} ({})",
        style(&plan.old_version).red(),
        style(&plan.new_version).green(),
        plan.kind
    );
    println!("  Tag:     {}", plan.tag);
    println!("  Files:");
    for target in &plan.targets {
        println!("    - {}", target.display());
    }
    match &plan.remote {
        Some(remote) => println!("  Push:    {}", remote),
        None => println!("  Push:    disabled"),
    }
}

pub fn display_release(record: &ReleaseRecord) {
    let version = record
        .new_version
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_default();
    let tag = record.tag.as_deref().unwrap_or("");
    if record.pushed {
        display_success(&format!("Released {} and pushed tag {}", version, tag));
    } else {
        display_success(&format!("Released {} with local tag {}", version, tag));
    }
}

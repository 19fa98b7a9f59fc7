//! Preflight checks.
//!
//! Verifies host tools and repository inputs before any module is built.
//! Run with `pxfbuild preflight`.

mod host_tools;
mod inputs;
mod types;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::layout::BuildLayout;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks. Never writes into the repository.
pub fn run_preflight(config: &Config, layout: &BuildLayout) -> PreflightReport {
    let mut report = PreflightReport::default();

    println!("Checking host tools...");
    report.checks.extend(host_tools::check_host_tools(config));

    println!("Checking repository inputs...");
    report.checks.extend(inputs::check_version_file(layout));
    report.checks.extend(inputs::check_modules(layout));
    report.checks.extend(inputs::check_package_inputs(layout));

    println!();
    report
}

/// Run preflight, print the report and, when `strict`, bail on any failure.
pub fn run_preflight_or_fail(config: &Config, layout: &BuildLayout, strict: bool) -> Result<()> {
    let report = run_preflight(config, layout);
    report.print();

    if strict && !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before building.",
            report.fail_count()
        );
    }

    if report.all_passed() {
        println!("All preflight checks passed!");
    }
    Ok(())
}

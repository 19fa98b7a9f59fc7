//! Clean command - cleans every module and removes `build/`.
//!
//! Runs without a [`Session`](super::Session): cleaning must work even when
//! platform facts cannot be resolved.

use crate::config::Config;
use crate::executor;
use crate::layout::BuildLayout;
use crate::module::ModuleRunner;
use crate::report::CleanReport;

/// Best-effort; problems are reported as warnings, never as errors.
pub fn cmd_clean(config: &Config, runner: &dyn ModuleRunner) -> CleanReport {
    println!("=== Cleaning ===\n");
    let layout = BuildLayout::new(&config.repo_root);
    let report = executor::clean_all(runner, &layout);
    report.print();
    if !report.warnings.is_empty() {
        println!("Clean finished with {} warning(s).", report.warnings.len());
    }
    report
}

//! Preflight command - runs preflight checks.

use anyhow::Result;

use crate::config::Config;
use crate::layout::BuildLayout;
use crate::preflight;

/// Execute the preflight command.
///
/// Needs no platform facts, so it works on hosts where resolving them would
/// fail.
pub fn cmd_preflight(config: &Config, strict: bool) -> Result<()> {
    config.print();
    println!();

    let layout = BuildLayout::new(&config.repo_root);
    preflight::run_preflight_or_fail(config, &layout, strict)?;
    if !strict {
        println!("Use --strict to exit non-zero on failed checks.");
    }
    Ok(())
}

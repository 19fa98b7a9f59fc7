//! Host tool availability checks.

use crate::config::Config;
use crate::process;

use super::types::CheckResult;

/// Tools every release needs, plus the packagers individual formats need.
pub fn check_host_tools(config: &Config) -> Vec<CheckResult> {
    let mut results = vec![
        check_tool(&config.make, true, "Required to build modules"),
        check_tool("git", true, "Required to record the source commit"),
    ];

    if let Some(major) = &config.major_version_override {
        results.push(CheckResult::pass(
            &config.version_tool,
            format!("skipped, GP_MAJOR_VERSION={}", major),
        ));
    } else {
        results.push(check_tool(
            &config.version_tool,
            true,
            "Required to detect the platform version. Set PG_CONFIG or source greenplum_path.sh.",
        ));
    }

    let optional = [
        ("rpmbuild", "Required for `pxfbuild rpm`"),
        ("rpm", "Required for `pxfbuild rpm-tar`"),
        ("dpkg-deb", "Required for `pxfbuild deb` and `deb-tar`"),
        ("gppkg", "Required for `pxfbuild gppkg-rpm`"),
    ];
    for (tool, purpose) in optional {
        results.push(check_tool(tool, false, purpose));
    }

    results
}

fn check_tool(tool: &str, required: bool, purpose: &str) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass(tool, path.display().to_string()),
        None => CheckResult::missing(tool, required, format!("Not found. {}", purpose)),
    }
}

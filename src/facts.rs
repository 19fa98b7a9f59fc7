//! Platform facts resolution.
//!
//! Reads the host platform major version from the platform's version tool
//! (`pg_config --gp_version`), the product version from the `version` file,
//! and the build architecture from the host. Nothing is written.

use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::layout::BuildLayout;
use crate::naming::normalize_arch;
use crate::process::Cmd;

/// Facts every other component is derived from. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformFacts {
    /// Host platform major version (always positive).
    pub major_version: u32,
    /// Normalized architecture token (hyphens, never underscores).
    pub build_architecture: String,
    /// Product version string from the `version` file.
    pub product_version: String,
}

impl PlatformFacts {
    /// Construct facts, normalizing the architecture token.
    pub fn new(major_version: u32, arch: &str, product_version: &str) -> Self {
        Self {
            major_version,
            build_architecture: normalize_arch(arch),
            product_version: product_version.trim().to_string(),
        }
    }

    pub fn print(&self) {
        println!("Platform facts:");
        println!("  Platform major version: {}", self.major_version);
        println!("  Build architecture: {}", self.build_architecture);
        println!("  Product version: {}", self.product_version);
    }
}

/// Resolve platform facts for a repository checkout.
///
/// Fails with [`Error::Environment`] if the version tool is missing or its
/// output has no parseable major version, or if the `version` file is
/// missing or empty. Idempotent for unchanged host state.
pub fn resolve(config: &Config, layout: &BuildLayout) -> Result<PlatformFacts> {
    let major_version = match &config.major_version_override {
        Some(raw) => parse_major_override(raw)?,
        None => query_major_version(&config.version_tool)?,
    };

    let arch = match &config.build_arch_override {
        Some(arch) => arch.clone(),
        None => std::env::consts::ARCH.to_string(),
    };
    let arch = normalize_arch(&arch);
    if arch.is_empty() {
        return Err(Error::Environment("build architecture is empty".into()));
    }

    let product_version = read_product_version(&layout.version_file())?;

    let facts = PlatformFacts {
        major_version,
        build_architecture: arch,
        product_version,
    };
    tracing::debug!(?facts, "resolved platform facts");
    Ok(facts)
}

fn parse_major_override(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(major) if major > 0 => Ok(major),
        _ => Err(Error::Environment(format!(
            "GP_MAJOR_VERSION must be a positive integer, got '{}'",
            raw
        ))),
    }
}

fn query_major_version(tool: &str) -> Result<u32> {
    let output = Cmd::new(tool)
        .arg("--gp_version")
        .error_msg(format!("'{} --gp_version' failed", tool))
        .run()
        .map_err(|e| Error::Environment(format!("{:#}", e)))?;

    parse_major_version(output.stdout_trimmed()).ok_or_else(|| {
        Error::Environment(format!(
            "cannot parse platform major version from '{}'",
            output.stdout_trimmed()
        ))
    })
}

/// Extract the major version from version-tool output.
///
/// Takes the first whitespace-separated token that starts with a digit, e.g.
/// `Greenplum Database 6.21.0 build commit:...` gives 6.
pub fn parse_major_version(output: &str) -> Option<u32> {
    let token = output
        .split_whitespace()
        .find(|t| t.starts_with(|c: char| c.is_ascii_digit()))?;
    let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u32>().ok().filter(|major| *major > 0)
}

fn read_product_version(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Environment(format!("cannot read {}: {}", path.display(), e))
    })?;
    let version = content.trim();
    if version.is_empty() {
        return Err(Error::Environment(format!("{} is empty", path.display())));
    }
    if version.contains(char::is_whitespace) {
        return Err(Error::Environment(format!(
            "{} must contain a single version string, got '{}'",
            path.display(),
            version
        )));
    }
    Ok(version.to_string())
}

/// Current source-control commit identifier.
pub fn resolve_commit(config: &Config, layout: &BuildLayout) -> Result<String> {
    if let Some(commit) = &config.commit_override {
        return Ok(commit.clone());
    }
    let output = Cmd::new("git")
        .args(["rev-parse", "--verify", "HEAD"])
        .dir(layout.repo_root())
        .run()
        .map_err(|e| Error::Staging(format!("cannot determine commit: {:#}", e)))?;
    let commit = output.stdout_trimmed();
    if commit.is_empty() {
        return Err(Error::Staging("git reported an empty commit id".into()));
    }
    Ok(commit.to_string())
}

/// OS tag such as `ubuntu18.04`, from `/etc/os-release` unless overridden.
pub fn resolve_os_tag(config: &Config) -> Option<String> {
    if let Some(tag) = &config.os_tag_override {
        return Some(tag.clone());
    }
    let content = fs::read_to_string("/etc/os-release").ok()?;
    parse_os_release(&content)
}

/// Build `<ID><VERSION_ID>` from os-release content.
pub fn parse_os_release(content: &str) -> Option<String> {
    let mut id = None;
    let mut version_id = None;
    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key {
            "ID" => id = Some(value.to_string()),
            "VERSION_ID" => version_id = Some(value.to_string()),
            _ => {}
        }
    }
    let id = id.filter(|s| !s.is_empty())?;
    Some(format!("{}{}", id, version_id.unwrap_or_default()))
}

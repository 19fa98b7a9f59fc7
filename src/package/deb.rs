//! DEB backend.
//!
//! Builds a package root at `build/debbuild/<package name>/` that places
//! everything under `/usr/local/pxf-gp<major>`. Extensions get their own
//! subdirectory (`gpextable/`, `fdw/`); the CLI and server merge at the
//! prefix root. `package/DEBIAN/` is copied in and its `control` file is
//! rendered before `dpkg-deb --build` runs.

use anyhow::{Context, Result as AnyResult};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Format, Result};
use crate::facts::PlatformFacts;
use crate::fsutil;
use crate::gate::FeatureGates;
use crate::layout::BuildLayout;
use crate::module;
use crate::naming::{self, PackageVersion};
use crate::process::{self, Cmd};
use crate::stage::{Installer, StagedTree, COMMIT_FILE};
use super::bundle::{self, ArtifactMetadata, BundleDirs};
use super::tarball::TarArtifact;

/// Control directory under `package/`.
pub const DEBIAN_DIR: &str = "DEBIAN";

/// Custom control field carrying the OS tag.
pub const OS_TAG_FIELD: &str = "X-Os-Tag";

/// A built `.deb`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebArtifact {
    pub path: PathBuf,
}

/// Values substituted into the control template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlParams {
    pub name: String,
    pub version: PackageVersion,
    pub maintainer: String,
    pub arch: String,
    pub os_tag: String,
}

impl ControlParams {
    pub fn new(config: &Config, facts: &PlatformFacts, os_tag: &str) -> Self {
        Self {
            name: naming::package_name(facts.major_version),
            version: PackageVersion::from_product_version(&facts.product_version),
            maintainer: config.maintainer.clone(),
            arch: deb_arch(&facts.build_architecture),
            os_tag: os_tag.to_string(),
        }
    }

    /// `build/debbuild/<name>-<main>-<release>-<os>-<arch>.deb`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}-{}.deb",
            self.name,
            self.version.full(),
            self.os_tag,
            self.arch
        )
    }
}

/// Map a build architecture to Debian's naming.
pub fn deb_arch(arch: &str) -> String {
    match arch {
        "x86_64" | "x86-64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

/// Install prefix inside the package.
pub fn install_prefix(major_version: u32) -> String {
    format!("usr/local/{}", naming::package_name(major_version))
}

/// Substitute `%NAME%`, `%VERSION%`, `%MAINTAINER%`, `%ARCH%` and `%OS_TAG%`.
pub fn render_control(template: &str, params: &ControlParams) -> String {
    template
        .replace("%NAME%", &params.name)
        .replace("%VERSION%", &params.version.full())
        .replace("%MAINTAINER%", &params.maintainer)
        .replace("%ARCH%", &params.arch)
        .replace("%OS_TAG%", &params.os_tag)
}

/// Populate the package root from per-module outputs. Returns the root.
pub fn prepare(
    layout: &BuildLayout,
    facts: &PlatformFacts,
    gates: &FeatureGates,
    tree: &StagedTree,
    params: &ControlParams,
) -> AnyResult<PathBuf> {
    let root = fsutil::prepare_work_dir(&layout.debbuild_dir(), &params.name)?;
    let prefix = root.join(install_prefix(facts.major_version));

    for module in module::modules() {
        if let Some(reason) = module.package_skip_reason(gates) {
            println!("  [SKIP] {}: {}", module.name, reason);
            continue;
        }
        let output = module.output_path(layout.repo_root());
        let target = if module.deb_subdir.is_empty() {
            prefix.clone()
        } else {
            prefix.join(module.deb_subdir)
        };
        fsutil::copy_tree(&output, &target)
            .with_context(|| format!("module '{}'", module.name))?;
    }

    if let Some(commit) = tree.commit() {
        fsutil::write_file_with_dirs(prefix.join(COMMIT_FILE), format!("{}\n", commit))?;
    }

    let control_src = layout.package_dir().join(DEBIAN_DIR);
    let control_dst = root.join(DEBIAN_DIR);
    fsutil::copy_tree(&control_src, &control_dst)?;

    let control = control_dst.join("control");
    let template = fs::read_to_string(&control)
        .with_context(|| format!("cannot read {}", control.display()))?;
    fs::write(&control, render_control(&template, params))?;

    Ok(root)
}

/// Build the DEB from the staged build.
pub fn pack(
    layout: &BuildLayout,
    config: &Config,
    facts: &PlatformFacts,
    gates: &FeatureGates,
    os_tag: &str,
) -> Result<DebArtifact> {
    build(layout, config, facts, gates, os_tag).map_err(|e| Error::packaging(Format::Deb, e))
}

fn build(
    layout: &BuildLayout,
    config: &Config,
    facts: &PlatformFacts,
    gates: &FeatureGates,
    os_tag: &str,
) -> AnyResult<DebArtifact> {
    let tree = StagedTree::existing(layout, facts)?;
    process::require("dpkg-deb", "Install the dpkg-dev package.")?;

    let params = ControlParams::new(config, facts, os_tag);
    println!("Building DEB {} {}...", params.name, params.version.full());
    let root = prepare(layout, facts, gates, &tree, &params)?;

    let path = layout.debbuild_dir().join(params.file_name());
    let tmp = path.with_extension("deb.tmp");
    Cmd::new("dpkg-deb")
        .args(["--root-owner-group", "--build"])
        .arg_path(&root)
        .arg_path(&tmp)
        .error_msg("dpkg-deb --build failed")
        .run()?;
    fsutil::commit_artifact(&tmp, &path)?;

    println!("  Built {}", path.display());
    Ok(DebArtifact { path })
}

/// Read package/version/arch/os tag back out of a built DEB.
pub fn query_metadata(deb: &Path) -> AnyResult<ArtifactMetadata> {
    let result = Cmd::new("dpkg-deb")
        .arg("--field")
        .arg_path(deb)
        .args(["Package", "Version", "Architecture", OS_TAG_FIELD])
        .error_msg(format!("cannot query {}", deb.display()))
        .run()?;
    parse_fields(&result.stdout)
        .with_context(|| format!("unexpected dpkg-deb output for {}", deb.display()))
}

/// Parse `Field: value` lines printed by `dpkg-deb --field`.
pub fn parse_fields(output: &str) -> Option<ArtifactMetadata> {
    let mut name = None;
    let mut version = None;
    let mut arch = None;
    let mut os_tag = None;
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "Package" => name = Some(value),
            "Version" => version = Some(value),
            "Architecture" => arch = Some(value),
            OS_TAG_FIELD => os_tag = Some(value).filter(|v| !v.is_empty()),
            _ => {}
        }
    }
    Some(ArtifactMetadata {
        name: name?,
        version: version?,
        os_tag,
        arch: arch?,
    })
}

/// Wrap a built DEB and the deb installer into
/// `build/distdeb/<bundle name>.tar.gz`.
pub fn bundle(layout: &BuildLayout, artifact: &DebArtifact) -> Result<TarArtifact> {
    let run = || -> AnyResult<TarArtifact> {
        let metadata = query_metadata(&artifact.path)?;
        let dirs = BundleDirs {
            stage: layout.stagedeb_dir(),
            dist: layout.distdeb_dir(),
        };
        bundle::write_bundle(layout, &artifact.path, &metadata, Installer::Deb, &dirs)
    };
    run().map_err(|e| Error::packaging(Format::Deb, e))
}

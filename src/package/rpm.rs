//! RPM backend.
//!
//! Lays out `build/rpmbuild/{BUILD,RPMS,SOURCES,SPECS}`, copies the staged
//! tree into SOURCES, renders `package/pxf.spec.in` and runs `rpmbuild`.
//! Only produced when the fdw-package gate is active.

use anyhow::{bail, Context, Result as AnyResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Format, Result};
use crate::facts::PlatformFacts;
use crate::fsutil;
use crate::gate::FeatureGates;
use crate::layout::BuildLayout;
use crate::naming::{self, PackageVersion};
use crate::process::{self, Cmd};
use crate::stage::{Installer, StagedTree};
use super::bundle::{self, ArtifactMetadata, BundleDirs};
use super::tarball::TarArtifact;

/// Spec template under `package/`.
pub const SPEC_TEMPLATE: &str = "pxf.spec.in";

const RPMBUILD_DIRS: [&str; 4] = ["BUILD", "RPMS", "SOURCES", "SPECS"];

/// A built `.rpm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmArtifact {
    pub path: PathBuf,
}

/// Values substituted into the spec template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecParams {
    pub name: String,
    pub version: PackageVersion,
    pub license: String,
    pub vendor: String,
    pub major_version: u32,
}

impl SpecParams {
    pub fn new(config: &Config, facts: &PlatformFacts) -> Self {
        Self {
            name: naming::package_name(facts.major_version),
            version: PackageVersion::from_product_version(&facts.product_version),
            license: config.license.clone(),
            vendor: config.vendor.clone(),
            major_version: facts.major_version,
        }
    }
}

/// Substitute `@NAME@`, `@VERSION@`, `@RELEASE@`, `@LICENSE@`, `@VENDOR@`
/// and `@GP_MAJOR@`.
pub fn render_spec(template: &str, params: &SpecParams) -> String {
    template
        .replace("@NAME@", &params.name)
        .replace("@VERSION@", &params.version.main_version)
        .replace("@RELEASE@", &params.version.release_tag)
        .replace("@LICENSE@", &params.license)
        .replace("@VENDOR@", &params.vendor)
        .replace("@GP_MAJOR@", &params.major_version.to_string())
}

/// Create a fresh rpmbuild tree from the staged tree. Returns the spec path.
pub fn prepare(layout: &BuildLayout, tree: &StagedTree, params: &SpecParams) -> AnyResult<PathBuf> {
    let topdir = layout.rpmbuild_dir();
    fsutil::reset_dir(&topdir)?;
    for dir in RPMBUILD_DIRS {
        fs::create_dir_all(topdir.join(dir))?;
    }

    fsutil::copy_tree(&tree.root, &topdir.join("SOURCES"))?;

    let template_path = layout.package_dir().join(SPEC_TEMPLATE);
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("cannot read spec template {}", template_path.display()))?;

    let spec = topdir.join("SPECS").join(format!("{}.spec", params.name));
    fs::write(&spec, render_spec(&template, params))?;
    Ok(spec)
}

/// Build the RPM.
///
/// Returns [`Error::GateSkipped`] without touching anything when the
/// fdw-package gate is inactive.
pub fn pack(
    layout: &BuildLayout,
    config: &Config,
    facts: &PlatformFacts,
    gates: &FeatureGates,
) -> Result<RpmArtifact> {
    gates.fdw_package.check()?;
    build(layout, config, facts).map_err(|e| Error::packaging(Format::Rpm, e))
}

fn build(layout: &BuildLayout, config: &Config, facts: &PlatformFacts) -> AnyResult<RpmArtifact> {
    let tree = StagedTree::existing(layout, facts)?;
    process::require("rpmbuild", "Install the rpm-build package.")?;

    let params = SpecParams::new(config, facts);
    println!(
        "Building RPM {} {}-{}...",
        params.name, params.version.main_version, params.version.release_tag
    );
    let spec = prepare(layout, &tree, &params)?;
    let topdir = fs::canonicalize(layout.rpmbuild_dir())?;

    Cmd::new("rpmbuild")
        .arg("--define")
        .arg(format!("_topdir {}", topdir.display()))
        .arg("-bb")
        .arg_path(&spec)
        .error_msg("rpmbuild failed")
        .run_interactive()?;

    let path = find_rpm(&topdir.join("RPMS"), &params.name)?;
    println!("  Built {}", path.display());
    Ok(RpmArtifact { path })
}

/// Locate the built package for `name` under `RPMS/`.
pub fn find_rpm(rpms_dir: &Path, name: &str) -> AnyResult<PathBuf> {
    let prefix = format!("{}-", name);
    let found: Vec<PathBuf> = WalkDir::new(rpms_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let file = e.file_name().to_string_lossy();
            file.starts_with(&prefix) && file.ends_with(".rpm")
        })
        .map(|e| e.into_path())
        .collect();

    match found.as_slice() {
        [one] => Ok(one.clone()),
        [] => bail!("no {}*.rpm found under {}", prefix, rpms_dir.display()),
        many => bail!(
            "expected one {}*.rpm under {}, found {}",
            prefix,
            rpms_dir.display(),
            many.len()
        ),
    }
}

/// Read name/version/release/arch back out of a built RPM.
pub fn query_metadata(rpm: &Path) -> AnyResult<ArtifactMetadata> {
    let result = Cmd::new("rpm")
        .args(["-qp", "--queryformat", "%{NAME}\\n%{VERSION}\\n%{RELEASE}\\n%{ARCH}\\n"])
        .arg_path(rpm)
        .error_msg(format!("cannot query {}", rpm.display()))
        .run()?;
    parse_query(&result.stdout)
        .with_context(|| format!("unexpected rpm query output for {}", rpm.display()))
}

/// Parse `NAME\nVERSION\nRELEASE\nARCH` query output.
///
/// The OS tag is the dist suffix of the release (`1.el8` gives `el8`).
pub fn parse_query(output: &str) -> Option<ArtifactMetadata> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
    let name = lines.next()?.to_string();
    let version = lines.next()?.to_string();
    let release = lines.next()?;
    let arch = lines.next()?.to_string();

    let os_tag = release
        .split_once('.')
        .map(|(_, dist)| dist.to_string())
        .filter(|d| !d.is_empty());

    Some(ArtifactMetadata {
        name,
        version,
        os_tag,
        arch,
    })
}

/// Wrap a built RPM and the rpm installer into
/// `build/distrpm/<bundle name>.tar.gz`.
pub fn bundle(layout: &BuildLayout, artifact: &RpmArtifact) -> Result<TarArtifact> {
    let run = || -> AnyResult<TarArtifact> {
        let metadata = query_metadata(&artifact.path)?;
        let dirs = BundleDirs {
            stage: layout.stagerpm_dir(),
            dist: layout.distrpm_dir(),
        };
        bundle::write_bundle(layout, &artifact.path, &metadata, Installer::Rpm, &dirs)
    };
    run().map_err(|e| Error::packaging(Format::Rpm, e))
}

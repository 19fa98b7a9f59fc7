//! Stage and package commands.
//!
//! Every packaging target first builds all modules and restages, the same
//! way `make tar` depends on `make stage`. Artifacts written by earlier
//! runs live outside the stage directory and are never touched by a
//! restage.

use std::path::PathBuf;

use crate::error::{Error, Format, Result};
use crate::facts;
use crate::manifest::ReleaseManifest;
use crate::package::{deb, gppkg, rpm, tarball, DebArtifact, RpmArtifact};
use crate::stage::{self, StagedTree};
use crate::timing::Timer;

use super::build::{cmd_build, BuildTarget};
use super::Session;

/// Which artifact a packaging command produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageTarget {
    Stage,
    Tar,
    Rpm,
    RpmTar,
    Deb,
    DebTar,
    GppkgRpm,
}

impl PackageTarget {
    pub fn name(self) -> &'static str {
        match self {
            PackageTarget::Stage => "stage",
            PackageTarget::Tar => "tar",
            PackageTarget::Rpm => "rpm",
            PackageTarget::RpmTar => "rpm-tar",
            PackageTarget::Deb => "deb",
            PackageTarget::DebTar => "deb-tar",
            PackageTarget::GppkgRpm => "gppkg-rpm",
        }
    }

    /// Backend blamed when the manifest for this target cannot be written.
    fn format(self) -> Format {
        match self {
            PackageTarget::Stage | PackageTarget::Tar => Format::Tar,
            PackageTarget::Rpm | PackageTarget::RpmTar => Format::Rpm,
            PackageTarget::Deb | PackageTarget::DebTar => Format::Deb,
            PackageTarget::GppkgRpm => Format::Gppkg,
        }
    }
}

/// The staged tree and every artifact a command wrote, in creation order.
#[derive(Debug, Clone)]
pub struct PackageOutput {
    pub tree: StagedTree,
    pub artifacts: Vec<PathBuf>,
    /// `build/manifest/<target>.json`, absent for `stage`
    pub manifest: Option<PathBuf>,
}

/// Execute a stage or packaging command.
///
/// RPM-based targets check the fdw-package gate before building anything,
/// so a skipped format leaves `build/` as it was.
pub fn cmd_package(session: &Session, target: PackageTarget) -> Result<PackageOutput> {
    match target {
        PackageTarget::Rpm | PackageTarget::RpmTar | PackageTarget::GppkgRpm => {
            session.gates.fdw_package.check()?;
        }
        _ => {}
    }
    if target == PackageTarget::GppkgRpm && session.config.gppkg_os.is_none() {
        return Err(Error::Packaging {
            format: Format::Gppkg,
            message: "GPPKG_OS is not set".to_string(),
        });
    }

    let tree = cmd_stage(session)?;
    let mut artifacts = Vec::new();

    match target {
        PackageTarget::Stage => {}
        PackageTarget::Tar => {
            let timer = Timer::start("tar");
            artifacts.push(tarball::pack(&session.layout, &tree)?.path);
            timer.finish();
        }
        PackageTarget::Rpm => {
            artifacts.push(build_rpm(session)?.path);
        }
        PackageTarget::RpmTar => {
            let built = build_rpm(session)?;
            let bundle = rpm::bundle(&session.layout, &built)?;
            artifacts.extend([built.path, bundle.path]);
        }
        PackageTarget::Deb => {
            artifacts.push(build_deb(session)?.path);
        }
        PackageTarget::DebTar => {
            let built = build_deb(session)?;
            let bundle = deb::bundle(&session.layout, &built)?;
            artifacts.extend([built.path, bundle.path]);
        }
        PackageTarget::GppkgRpm => {
            let built = build_rpm(session)?;
            let wrapped = gppkg::pack(&session.layout, &session.config, &session.facts, &built)?;
            artifacts.extend([built.path, wrapped.path]);
        }
    }

    if artifacts.is_empty() {
        return Ok(PackageOutput {
            tree,
            artifacts,
            manifest: None,
        });
    }

    let manifest = write_manifest(session, target, &tree, &artifacts)
        .map_err(|e| Error::packaging(target.format(), e))?;

    println!("\n=== {} complete ===", target.name());
    for artifact in &artifacts {
        println!("  {}", artifact.display());
    }
    println!("  {}", manifest.display());

    Ok(PackageOutput {
        tree,
        artifacts,
        manifest: Some(manifest),
    })
}

fn write_manifest(
    session: &Session,
    target: PackageTarget,
    tree: &StagedTree,
    artifacts: &[PathBuf],
) -> anyhow::Result<PathBuf> {
    let commit = tree.commit().unwrap_or_default();
    let mut manifest = ReleaseManifest::new(&session.facts, &session.gates, &commit);
    for artifact in artifacts {
        manifest.add_artifact(&session.layout, artifact)?;
    }
    let path = ReleaseManifest::path_for(&session.layout, target.name());
    manifest.save(&path)?;
    Ok(path)
}

/// Build every module and assemble the staged tree.
pub fn cmd_stage(session: &Session) -> Result<StagedTree> {
    let report = cmd_build(session, BuildTarget::All)?;
    let commit = facts::resolve_commit(&session.config, &session.layout)?;

    println!();
    let timer = Timer::start("stage");
    let tree = stage::stage(
        &session.layout,
        &session.facts,
        &session.gates,
        &report,
        &commit,
    )?;
    timer.finish();
    println!("Staged {}", tree.root.display());
    Ok(tree)
}

fn build_rpm(session: &Session) -> Result<RpmArtifact> {
    let timer = Timer::start("rpm");
    let artifact = rpm::pack(
        &session.layout,
        &session.config,
        &session.facts,
        &session.gates,
    )?;
    timer.finish();
    Ok(artifact)
}

fn build_deb(session: &Session) -> Result<DebArtifact> {
    let Some(os_tag) = facts::resolve_os_tag(&session.config) else {
        return Err(Error::Packaging {
            format: Format::Deb,
            message: "cannot determine OS tag from /etc/os-release; set OS_TAG".to_string(),
        });
    };

    let timer = Timer::start("deb");
    let artifact = deb::pack(
        &session.layout,
        &session.config,
        &session.facts,
        &session.gates,
        &os_tag,
    )?;
    timer.finish();
    Ok(artifact)
}

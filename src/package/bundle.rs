//! Installer bundles - a secondary tarball wrapping a built package.
//!
//! The bundle directory name is read back out of the package itself, so it
//! can never disagree with the artifact it wraps.

use anyhow::{bail, Result as AnyResult};
use std::path::{Path, PathBuf};

use crate::fsutil;
use crate::layout::BuildLayout;
use crate::stage::Installer;
use super::tarball::{self, TarArtifact};

/// Name components embedded in a built package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    pub name: String,
    pub version: String,
    pub os_tag: Option<String>,
    pub arch: String,
}

impl ArtifactMetadata {
    /// `<name>-<version>-<os tag>-<arch>`; the OS tag is omitted when unknown.
    pub fn bundle_name(&self) -> String {
        match &self.os_tag {
            Some(os) => format!("{}-{}-{}-{}", self.name, self.version, os, self.arch),
            None => format!("{}-{}-{}", self.name, self.version, self.arch),
        }
    }
}

/// Where a bundle is assembled and where its tarball lands.
#[derive(Debug, Clone)]
pub(crate) struct BundleDirs {
    pub stage: PathBuf,
    pub dist: PathBuf,
}

/// Copy `artifact` and the matching installer into
/// `<stage>/<bundle name>/` and archive it to `<dist>/<bundle name>.tar.gz`.
pub(crate) fn write_bundle(
    layout: &BuildLayout,
    artifact: &Path,
    metadata: &ArtifactMetadata,
    installer: Installer,
    dirs: &BundleDirs,
) -> AnyResult<TarArtifact> {
    let Some(file_name) = artifact.file_name() else {
        bail!("{} is not a file", artifact.display());
    };

    let name = metadata.bundle_name();
    fsutil::reset_dir(&dirs.stage)?;
    fsutil::reset_dir(&dirs.dist)?;

    let bundle_dir = dirs.stage.join(&name);
    std::fs::create_dir_all(&bundle_dir)?;
    std::fs::copy(artifact, bundle_dir.join(file_name))?;
    installer.install_into(layout, &bundle_dir)?;

    let path = dirs.dist.join(format!("{}.tar.gz", name));
    println!("Creating {}...", path.display());
    tarball::write_tar_gz(&bundle_dir, &name, &path)?;

    Ok(TarArtifact { path })
}

//! Build directory layout.
//!
//! Every component receives a [`BuildLayout`] instead of joining paths onto
//! the repository root itself. The directory shapes are consumed by
//! downstream deployment tooling:
//!
//! ```text
//! build/stage/<release>/            staged tree
//! build/dist/<release>.tar.gz       tar artifact
//! build/rpmbuild/{BUILD,RPMS,SOURCES,SPECS}
//! build/stagerpm/, build/distrpm/   rpm bundle
//! build/debbuild/                   deb root + .deb
//! build/stagedeb/, build/distdeb/   deb bundle
//! build/gppkg/                      gppkg wrapper input
//! ```

use std::path::{Path, PathBuf};

/// Paths of one repository checkout and its build root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    repo_root: PathBuf,
    build_root: PathBuf,
}

impl BuildLayout {
    /// Layout for a repository; the build root is `<repo_root>/build`.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        let build_root = repo_root.join("build");
        Self {
            repo_root,
            build_root,
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    /// File holding the product version string.
    pub fn version_file(&self) -> PathBuf {
        self.repo_root.join("version")
    }

    /// Installer stubs and packaging templates.
    pub fn package_dir(&self) -> PathBuf {
        self.repo_root.join("package")
    }

    pub fn stage_root(&self) -> PathBuf {
        self.build_root.join("stage")
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.build_root.join("dist")
    }

    pub fn rpmbuild_dir(&self) -> PathBuf {
        self.build_root.join("rpmbuild")
    }

    pub fn stagerpm_dir(&self) -> PathBuf {
        self.build_root.join("stagerpm")
    }

    pub fn distrpm_dir(&self) -> PathBuf {
        self.build_root.join("distrpm")
    }

    pub fn debbuild_dir(&self) -> PathBuf {
        self.build_root.join("debbuild")
    }

    pub fn stagedeb_dir(&self) -> PathBuf {
        self.build_root.join("stagedeb")
    }

    pub fn distdeb_dir(&self) -> PathBuf {
        self.build_root.join("distdeb")
    }

    pub fn gppkg_dir(&self) -> PathBuf {
        self.build_root.join("gppkg")
    }
}

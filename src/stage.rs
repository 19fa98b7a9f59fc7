//! Staging - merges per-module outputs into one release directory.
//!
//! The staged tree lives at `build/stage/<release name>/` and is recreated
//! from scratch on every run:
//!
//! ```text
//! build/stage/pxf-gp-7-1.2.3-x86-64/
//! ├── <external-table output>
//! ├── <fdw output>            (only when the fdw-build gate is active)
//! ├── <cli output>
//! ├── <server output>
//! ├── commit.sha
//! └── install_component       (binary installer)
//! ```
//!
//! Modules are merged in declaration order. Two modules shipping the same
//! relative path is allowed; the later module's copy wins.

use anyhow::{bail, Result as AnyResult};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::facts::PlatformFacts;
use crate::fsutil;
use crate::gate::FeatureGates;
use crate::layout::BuildLayout;
use crate::module;
use crate::naming;
use crate::report::BuildReport;

/// File at the tree root holding the source commit.
pub const COMMIT_FILE: &str = "commit.sha";

/// Name the installer stub is given inside a tree or bundle.
pub const INSTALLER_NAME: &str = "install_component";

/// Installer stubs shipped in `package/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installer {
    /// Plain tarball installs.
    Binary,
    /// RPM bundle installs.
    Rpm,
    /// DEB bundle installs.
    Deb,
}

impl Installer {
    pub fn file_name(self) -> &'static str {
        match self {
            Installer::Binary => "install_binary",
            Installer::Rpm => "install_rpm",
            Installer::Deb => "install_deb",
        }
    }

    pub fn source(self, layout: &BuildLayout) -> PathBuf {
        layout.package_dir().join(self.file_name())
    }

    /// Copy this installer into `dir` as `install_component`.
    pub fn install_into(self, layout: &BuildLayout, dir: &Path) -> AnyResult<()> {
        fsutil::install_executable(&self.source(layout), &dir.join(INSTALLER_NAME))
    }
}

/// A populated staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTree {
    pub release_name: String,
    pub root: PathBuf,
}

impl StagedTree {
    /// Where the tree for `facts` lives, whether or not it exists yet.
    pub fn path_for(layout: &BuildLayout, facts: &PlatformFacts) -> Self {
        let release_name = naming::release_name(facts);
        let root = layout.stage_root().join(&release_name);
        Self { release_name, root }
    }

    /// The tree a previous `stage` run produced for `facts`.
    pub fn existing(layout: &BuildLayout, facts: &PlatformFacts) -> AnyResult<Self> {
        let tree = Self::path_for(layout, facts);
        if !tree.root.is_dir() {
            bail!(
                "staged tree {} not found. Run 'pxfbuild stage' first.",
                tree.root.display()
            );
        }
        Ok(tree)
    }

    /// Commit identifier recorded in the tree.
    pub fn commit(&self) -> Option<String> {
        std::fs::read_to_string(self.root.join(COMMIT_FILE))
            .ok()
            .map(|s| s.trim().to_string())
    }
}

/// Assemble the staged tree for `facts`.
///
/// Fails with [`Error::Staging`] if `report` contains a failed module, if an
/// included module's output directory is missing, or if any copy fails. Running
/// it twice with unchanged inputs yields identical trees.
pub fn stage(
    layout: &BuildLayout,
    facts: &PlatformFacts,
    gates: &FeatureGates,
    report: &BuildReport,
    commit: &str,
) -> Result<StagedTree> {
    if let Some((module, message)) = report.failures().next() {
        return Err(Error::Staging(format!(
            "module '{}' failed to build: {}",
            module, message
        )));
    }

    let tree = StagedTree::path_for(layout, facts);
    println!("Staging {}...", tree.release_name);

    fsutil::reset_dir(&tree.root).map_err(Error::staging)?;

    for module in module::modules() {
        if let Some(reason) = module.package_skip_reason(gates) {
            println!("  [SKIP] {}: {}", module.name, reason);
            continue;
        }

        let output = module.output_path(layout.repo_root());
        if !output.is_dir() {
            return Err(Error::Staging(format!(
                "output directory {} of module '{}' is missing. Build it first.",
                output.display(),
                module.name
            )));
        }

        let copied = fsutil::copy_tree(&output, &tree.root)
            .map_err(|e| Error::Staging(format!("module '{}': {:#}", module.name, e)))?;
        println!("  {} ({} files)", module.name, copied);
    }

    fsutil::write_file_with_dirs(tree.root.join(COMMIT_FILE), format!("{}\n", commit))
        .map_err(Error::staging)?;

    Installer::Binary
        .install_into(layout, &tree.root)
        .map_err(|e| Error::Staging(format!("installer stub: {:#}", e)))?;

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Operation;
    use crate::report::{OperationReport, Outcome};
    use std::fs;

    fn repo(dir: &Path) -> BuildLayout {
        let layout = BuildLayout::new(dir);
        for module in module::modules() {
            let out = module.output_path(dir);
            fs::create_dir_all(&out).unwrap();
            fs::write(out.join(format!("{}.txt", module.name)), module.name).unwrap();
        }
        fs::create_dir_all(layout.package_dir()).unwrap();
        fs::write(Installer::Binary.source(&layout), "#!/bin/sh\necho binary\n").unwrap();
        layout
    }

    #[test]
    fn test_stage_refuses_failed_report() {
        let dir = tempfile::tempdir().unwrap();
        let layout = repo(dir.path());
        let facts = PlatformFacts::new(7, "x86_64", "1.2.3");
        let mut report = OperationReport::new(Operation::Build);
        report.push("cli", Outcome::Failed("boom".into()));

        let err = stage(&layout, &facts, &FeatureGates::evaluate(&facts), &report, "abc")
            .unwrap_err();
        assert!(matches!(err, Error::Staging(_)));
        assert!(err.to_string().contains("cli"));
        assert!(!layout.stage_root().exists());
    }

    #[test]
    fn test_stage_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = repo(dir.path());
        fs::remove_dir_all(module::SERVER.output_path(dir.path())).unwrap();
        let facts = PlatformFacts::new(7, "x86_64", "1.2.3");
        let report = OperationReport::new(Operation::Build);

        let err = stage(&layout, &facts, &FeatureGates::evaluate(&facts), &report, "abc")
            .unwrap_err();
        assert!(err.to_string().contains("server"));
    }

    #[test]
    fn test_stage_missing_installer() {
        let dir = tempfile::tempdir().unwrap();
        let layout = repo(dir.path());
        fs::remove_file(Installer::Binary.source(&layout)).unwrap();
        let facts = PlatformFacts::new(7, "x86_64", "1.2.3");
        let report = OperationReport::new(Operation::Build);

        let err = stage(&layout, &facts, &FeatureGates::evaluate(&facts), &report, "abc")
            .unwrap_err();
        assert!(err.to_string().contains("installer stub"));
    }

    #[test]
    fn test_stage_removes_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = repo(dir.path());
        let facts = PlatformFacts::new(7, "x86_64", "1.2.3");
        let gates = FeatureGates::evaluate(&facts);
        let report = OperationReport::new(Operation::Build);

        let tree = stage(&layout, &facts, &gates, &report, "abc").unwrap();
        fs::write(tree.root.join("stale.jar"), "old").unwrap();

        let tree = stage(&layout, &facts, &gates, &report, "abc").unwrap();
        assert!(!tree.root.join("stale.jar").exists());
        assert_eq!(tree.commit().as_deref(), Some("abc"));
        assert!(tree.root.join(INSTALLER_NAME).is_file());
    }

    #[test]
    fn test_stage_at_six_leaves_out_fdw() {
        let dir = tempfile::tempdir().unwrap();
        let layout = repo(dir.path());
        let facts = PlatformFacts::new(6, "x86_64", "1.2.3");
        let report = OperationReport::new(Operation::Build);

        let tree = stage(&layout, &facts, &FeatureGates::evaluate(&facts), &report, "abc")
            .unwrap();
        assert!(!tree.root.join("fdw.txt").exists());
        assert!(tree.root.join("external-table.txt").is_file());
        assert!(tree.root.join("server.txt").is_file());
    }

    #[test]
    fn test_existing_requires_tree() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        let facts = PlatformFacts::new(7, "x86_64", "1.2.3");
        let err = StagedTree::existing(&layout, &facts).unwrap_err();
        assert!(err.to_string().contains("pxfbuild stage"));
    }
}

//! Release manifests.
//!
//! Every packaging command records what it produced in
//! `build/manifest/<target>.json`: the facts the release was built from,
//! which modules went in (and why any were left out), and the SHA256 of
//! each artifact. The file holds no timestamps, so unchanged inputs give a
//! byte-identical manifest.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::facts::PlatformFacts;
use crate::fsutil;
use crate::gate::FeatureGates;
use crate::layout::BuildLayout;
use crate::module;
use crate::naming;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseManifest {
    pub release_name: String,
    pub package_name: String,
    pub product_version: String,
    pub platform_major_version: u32,
    pub build_architecture: String,
    pub commit: String,
    pub modules: Vec<ModuleEntry>,
    pub artifacts: Vec<ArtifactEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub included: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// File or directory name, relative to `build/`
    pub path: String,
    /// Absent for directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ReleaseManifest {
    pub fn new(facts: &PlatformFacts, gates: &FeatureGates, commit: &str) -> Self {
        let modules = module::modules()
            .iter()
            .map(|m| {
                let skip_reason = m.package_skip_reason(gates).map(str::to_string);
                ModuleEntry {
                    name: m.name.to_string(),
                    included: skip_reason.is_none(),
                    skip_reason,
                }
            })
            .collect();

        Self {
            release_name: naming::release_name(facts),
            package_name: naming::package_name(facts.major_version),
            product_version: facts.product_version.clone(),
            platform_major_version: facts.major_version,
            build_architecture: facts.build_architecture.clone(),
            commit: commit.to_string(),
            modules,
            artifacts: Vec::new(),
        }
    }

    /// Record an artifact, hashing it if it is a file.
    pub fn add_artifact(&mut self, layout: &BuildLayout, path: &Path) -> Result<()> {
        let rel = relative_to_build(layout, path);
        let (sha256, size) = if path.is_file() {
            let (hash, size) = sha256_file(path)?;
            (Some(hash), Some(size))
        } else {
            (None, None)
        };

        self.artifacts.push(ArtifactEntry {
            path: rel,
            sha256,
            size,
        });
        Ok(())
    }

    /// `build/manifest/<target>.json`
    pub fn path_for(layout: &BuildLayout, target: &str) -> PathBuf {
        layout.build_root().join("manifest").join(format!("{}.json", target))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fsutil::write_file_with_dirs(path, format!("{}\n", json))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read manifest {}", path.display()))?;
        let manifest = serde_json::from_str(&json)
            .with_context(|| format!("invalid manifest {}", path.display()))?;
        Ok(manifest)
    }
}

fn relative_to_build(layout: &BuildLayout, path: &Path) -> String {
    if let Ok(rel) = path.strip_prefix(layout.build_root()) {
        return rel.to_string_lossy().into_owned();
    }
    // rpmbuild reports canonical paths
    if let Ok(root) = std::fs::canonicalize(layout.build_root()) {
        if let Ok(rel) = path.strip_prefix(&root) {
            return rel.to_string_lossy().into_owned();
        }
    }
    path.to_string_lossy().into_owned()
}

/// Streamed SHA256 of a file, with its size.
pub fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let mut file =
        File::open(path).with_context(|| format!("cannot open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    let size = io::copy(&mut file, &mut hasher)?;
    Ok((format!("{:x}", hasher.finalize()), size))
}

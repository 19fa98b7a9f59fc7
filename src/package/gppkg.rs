//! Greenplum package wrapper around the RPM.

use anyhow::{bail, Context, Result as AnyResult};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Format, Result};
use crate::facts::PlatformFacts;
use crate::fsutil;
use crate::layout::BuildLayout;
use crate::process::{self, Cmd};
use super::rpm::RpmArtifact;

/// Template under `package/`.
pub const SPEC_TEMPLATE: &str = "gppkg_spec.yml.in";

/// Version of the gppkg wrapper format.
pub const GPPKG_VERSION: &str = "1.0";

/// Extension of the file `gppkg --build` writes.
const GPPKG_EXT: &str = "gppkg";

/// A built gppkg and the work directory it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GppkgArtifact {
    /// `build/<name>.gppkg`
    pub path: PathBuf,
    /// Directory handed to `gppkg --build`
    pub dir: PathBuf,
}

/// Substitute `#arch`, `#os`, `#gppkgver` and `#gpver`.
pub fn render_spec(template: &str, arch: &str, os: &str, major_version: u32) -> String {
    template
        .replace("#gppkgver", GPPKG_VERSION)
        .replace("#gpver", &major_version.to_string())
        .replace("#arch", arch)
        .replace("#os", os)
}

/// Wrap `rpm` for the gppkg installer.
///
/// Needs `GPPKG_OS`; without it nothing is written.
pub fn pack(
    layout: &BuildLayout,
    config: &Config,
    facts: &PlatformFacts,
    rpm: &RpmArtifact,
) -> Result<GppkgArtifact> {
    let Some(os) = config.gppkg_os.as_deref() else {
        return Err(Error::Packaging {
            format: Format::Gppkg,
            message: "GPPKG_OS is not set".to_string(),
        });
    };
    build(layout, facts, rpm, os).map_err(|e| Error::packaging(Format::Gppkg, e))
}

fn build(
    layout: &BuildLayout,
    facts: &PlatformFacts,
    rpm: &RpmArtifact,
    os: &str,
) -> AnyResult<GppkgArtifact> {
    let dir = prepare(layout, facts, rpm, os)?;
    process::require("gppkg", "Source greenplum_path.sh so gppkg is on PATH.")?;

    // gppkg writes into its working directory; drop packages from earlier runs
    for old in find_packages(layout.build_root())? {
        fs::remove_file(&old).with_context(|| format!("cannot remove {}", old.display()))?;
    }

    println!("Building gppkg in {}...", dir.display());
    Cmd::new("gppkg")
        .arg("--build")
        .arg_path(&dir)
        .dir(layout.build_root())
        .error_msg("gppkg --build failed")
        .run_interactive()?;

    let path = match find_packages(layout.build_root())?.as_slice() {
        [path] => path.clone(),
        [] => bail!("gppkg --build wrote no .{} file", GPPKG_EXT),
        many => bail!("gppkg --build wrote {} .{} files", many.len(), GPPKG_EXT),
    };
    println!("  Built {}", path.display());
    Ok(GppkgArtifact { path, dir })
}

/// `*.gppkg` files directly under `dir`, sorted.
fn find_packages(dir: &Path) -> AnyResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == GPPKG_EXT) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Render the spec and copy the RPM into a fresh `build/gppkg/`.
pub fn prepare(
    layout: &BuildLayout,
    facts: &PlatformFacts,
    rpm: &RpmArtifact,
    os: &str,
) -> AnyResult<PathBuf> {
    let dir = layout.gppkg_dir();
    fsutil::reset_dir(&dir)?;

    let template_path = layout.package_dir().join(SPEC_TEMPLATE);
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("cannot read {}", template_path.display()))?;
    let arch = facts.build_architecture.replace('-', "_");
    let spec = render_spec(&template, &arch, os, facts.major_version);
    fs::write(dir.join("gppkg_spec.yml"), spec)?;

    let file_name = rpm
        .path
        .file_name()
        .with_context(|| format!("{} is not a file", rpm.path.display()))?;
    fs::copy(&rpm.path, dir.join(file_name))
        .with_context(|| format!("cannot copy {}", rpm.path.display()))?;

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TEMPLATE: &str = "PkgName: pxf\nVersion: #gppkgver\nGPDBVersion: #gpver\n\
                            Architecture: #arch\nOS: #os\n";

    #[test]
    fn test_render_spec() {
        let spec = render_spec(TEMPLATE, "x86_64", "rhel8", 7);
        assert_eq!(
            spec,
            "PkgName: pxf\nVersion: 1.0\nGPDBVersion: 7\nArchitecture: x86_64\nOS: rhel8\n"
        );
    }

    #[test]
    fn test_pack_requires_gppkg_os() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        let config = Config::from_vars(dir.path(), &HashMap::new());
        let facts = PlatformFacts::new(7, "x86_64", "1.2.3");
        let rpm = RpmArtifact {
            path: dir.path().join("pxf-gp7.rpm"),
        };

        let err = pack(&layout, &config, &facts, &rpm).unwrap_err();
        assert!(matches!(err, Error::Packaging { format: Format::Gppkg, .. }));
        assert!(err.to_string().contains("GPPKG_OS"));
        assert!(!layout.gppkg_dir().exists());
    }

    #[test]
    fn test_find_packages_only_matches_gppkg_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.gppkg"), "b").unwrap();
        fs::write(dir.path().join("a.gppkg"), "a").unwrap();
        fs::write(dir.path().join("pxf.rpm"), "rpm").unwrap();
        fs::create_dir(dir.path().join("gppkg")).unwrap();

        let found = find_packages(dir.path()).unwrap();
        assert_eq!(
            found,
            [dir.path().join("a.gppkg"), dir.path().join("b.gppkg")]
        );
    }

    #[test]
    fn test_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        fs::create_dir_all(layout.package_dir()).unwrap();
        fs::write(layout.package_dir().join(SPEC_TEMPLATE), TEMPLATE).unwrap();
        let rpm = RpmArtifact {
            path: dir.path().join("pxf-gp7-1.2.3-1.el8.x86_64.rpm"),
        };
        fs::write(&rpm.path, "rpm").unwrap();
        let facts = PlatformFacts::new(7, "x86_64", "1.2.3");

        let out = prepare(&layout, &facts, &rpm, "rhel8").unwrap();
        assert_eq!(out, layout.gppkg_dir());
        assert!(out.join("pxf-gp7-1.2.3-1.el8.x86_64.rpm").is_file());
        let spec = fs::read_to_string(out.join("gppkg_spec.yml")).unwrap();
        assert!(spec.contains("OS: rhel8"));
        assert!(spec.contains("GPDBVersion: 7"));
    }
}

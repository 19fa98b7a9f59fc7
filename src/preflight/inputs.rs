//! Repository input checks.
//!
//! Installers must start with a shebang and templates must still carry
//! their placeholders; existence alone is not enough.

use std::fs;
use std::path::Path;

use crate::layout::BuildLayout;
use crate::module;
use crate::package::{deb, gppkg, rpm};
use crate::stage::Installer;

use super::types::CheckResult;

pub fn check_version_file(layout: &BuildLayout) -> Vec<CheckResult> {
    let path = layout.version_file();
    let result = match fs::read_to_string(&path) {
        Err(e) => CheckResult::fail("version", format!("Cannot read {}: {}", path.display(), e)),
        Ok(content) => {
            let version = content.trim();
            if version.is_empty() {
                CheckResult::fail("version", "File is empty")
            } else if version.contains(char::is_whitespace) {
                CheckResult::fail("version", format!("'{}' contains whitespace", version))
            } else {
                CheckResult::pass("version", version)
            }
        }
    };
    vec![result]
}

/// Each module directory must carry a makefile.
pub fn check_modules(layout: &BuildLayout) -> Vec<CheckResult> {
    module::modules()
        .iter()
        .map(|m| {
            let dir = m.source_path(layout.repo_root());
            if dir.join("Makefile").is_file() || dir.join("makefile").is_file() {
                CheckResult::pass(m.name, dir.display().to_string())
            } else {
                CheckResult::fail(m.name, format!("No Makefile in {}", dir.display()))
            }
        })
        .collect()
}

pub fn check_package_inputs(layout: &BuildLayout) -> Vec<CheckResult> {
    let package = layout.package_dir();
    let mut results = Vec::new();

    // The binary installer goes into every tarball; the others only into bundles
    for installer in [Installer::Binary, Installer::Rpm, Installer::Deb] {
        let name = format!("package/{}", installer.file_name());
        let required = installer == Installer::Binary;
        results.push(match validate_installer(&installer.source(layout)) {
            Ok(lines) => CheckResult::pass(&name, format!("{} lines", lines)),
            Err(e) => CheckResult::missing(&name, required, e),
        });
    }

    let templates: [(&str, &[&str]); 3] = [
        (rpm::SPEC_TEMPLATE, &["@NAME@", "@VERSION@", "@RELEASE@"]),
        (
            "DEBIAN/control",
            &["%NAME%", "%VERSION%", "%ARCH%", deb::OS_TAG_FIELD],
        ),
        (gppkg::SPEC_TEMPLATE, &["#arch", "#os", "#gpver"]),
    ];
    for (file, placeholders) in templates {
        let name = format!("package/{}", file);
        results.push(match validate_template(&package.join(file), placeholders) {
            Ok(()) => CheckResult::pass(&name, "placeholders present"),
            Err(e) => CheckResult::warn(&name, e),
        });
    }

    results
}

fn validate_installer(path: &Path) -> Result<usize, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Cannot read: {}", e))?;
    let first = content.lines().next().unwrap_or_default();
    if !first.starts_with("#!") {
        return Err("No shebang - not an executable script".to_string());
    }
    Ok(content.lines().count())
}

fn validate_template(path: &Path, placeholders: &[&str]) -> Result<(), String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Cannot read: {}", e))?;
    let missing: Vec<&str> = placeholders
        .iter()
        .copied()
        .filter(|p| !content.contains(p))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("missing placeholders: {}", missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight::CheckStatus;

    #[test]
    fn test_version_file_checks() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());

        assert_eq!(check_version_file(&layout)[0].status, CheckStatus::Fail);

        fs::write(layout.version_file(), "1.2 3\n").unwrap();
        assert_eq!(check_version_file(&layout)[0].status, CheckStatus::Fail);

        fs::write(layout.version_file(), "1.2.3-SNAPSHOT\n").unwrap();
        let check = &check_version_file(&layout)[0];
        assert_eq!(check.status, CheckStatus::Pass);
        assert_eq!(check.details.as_deref(), Some("1.2.3-SNAPSHOT"));
    }

    #[test]
    fn test_module_makefiles() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        fs::create_dir_all(module::CLI.source_path(dir.path())).unwrap();
        fs::write(module::CLI.source_path(dir.path()).join("Makefile"), "all:\n").unwrap();

        let results = check_modules(&layout);
        let status = |name: &str| results.iter().find(|c| c.name == name).unwrap().status;
        assert_eq!(status("cli"), CheckStatus::Pass);
        assert_eq!(status("server"), CheckStatus::Fail);
    }

    #[test]
    fn test_package_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        let package = layout.package_dir();
        fs::create_dir_all(package.join("DEBIAN")).unwrap();
        fs::write(package.join("install_binary"), "#!/bin/sh\necho ok\n").unwrap();
        fs::write(package.join("install_rpm"), "echo no shebang\n").unwrap();
        fs::write(package.join("pxf.spec.in"), "Name: @NAME@\nVersion: @VERSION@\n").unwrap();

        let results = check_package_inputs(&layout);
        let status = |name: &str| results.iter().find(|c| c.name == name).unwrap().status;

        assert_eq!(status("package/install_binary"), CheckStatus::Pass);
        assert_eq!(status("package/install_rpm"), CheckStatus::Warn);
        assert_eq!(status("package/install_deb"), CheckStatus::Warn);
        // @RELEASE@ is missing
        assert_eq!(status("package/pxf.spec.in"), CheckStatus::Warn);
        assert_eq!(status("package/DEBIAN/control"), CheckStatus::Warn);
    }

    #[test]
    fn test_missing_binary_installer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        let results = check_package_inputs(&layout);
        let binary = results
            .iter()
            .find(|c| c.name == "package/install_binary")
            .unwrap();
        assert_eq!(binary.status, CheckStatus::Fail);
    }
}

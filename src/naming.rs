//! Release and package naming.
//!
//! Independently-invoked packaging steps agree on directory names only
//! because they all derive them here, from the same facts.

use crate::facts::PlatformFacts;

/// Prefix of every release name.
pub const PRODUCT_PREFIX: &str = "pxf-gp";

/// Canonical release name: `pxf-gp-<major>-<productVersion>-<arch>`.
pub fn release_name(facts: &PlatformFacts) -> String {
    format!(
        "{}-{}-{}-{}",
        PRODUCT_PREFIX,
        facts.major_version,
        facts.product_version,
        normalize_arch(&facts.build_architecture)
    )
}

/// Package name used by the RPM and DEB backends, e.g. `pxf-gp6`.
pub fn package_name(major_version: u32) -> String {
    format!("{}{}", PRODUCT_PREFIX, major_version)
}

/// Architecture tokens never contain underscores.
pub fn normalize_arch(arch: &str) -> String {
    arch.trim().replace('_', "-")
}

/// Release tag for versions with a pre-release suffix.
pub const SNAPSHOT_RELEASE: &str = "SNAPSHOT";

/// Release tag for final versions.
pub const FINAL_RELEASE: &str = "1";

/// Version/release pair for binary packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    /// Product version with any pre-release suffix stripped.
    pub main_version: String,
    /// `SNAPSHOT` for pre-release versions, `1` otherwise.
    pub release_tag: String,
}

impl PackageVersion {
    /// Derived from the product version string alone.
    pub fn from_product_version(version: &str) -> Self {
        let version = version.trim();
        match version.split_once('-') {
            Some((main, _suffix)) => Self {
                main_version: main.to_string(),
                release_tag: SNAPSHOT_RELEASE.to_string(),
            },
            None => Self {
                main_version: version.to_string(),
                release_tag: FINAL_RELEASE.to_string(),
            },
        }
    }

    /// `<main>-<release>`, the Debian version field.
    pub fn full(&self) -> String {
        format!("{}-{}", self.main_version, self.release_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_name() {
        let facts = PlatformFacts::new(6, "x86_64", "1.2.3");
        assert_eq!(release_name(&facts), "pxf-gp-6-1.2.3-x86-64");
    }

    #[test]
    fn test_release_name_is_stable() {
        let a = PlatformFacts::new(7, "aarch64", "2.0.0-SNAPSHOT");
        let b = PlatformFacts::new(7, "aarch64", "2.0.0-SNAPSHOT");
        assert_eq!(release_name(&a), release_name(&b));
        assert_eq!(release_name(&a), release_name(&a));
    }

    #[test]
    fn test_release_name_normalizes_unnormalized_facts() {
        // Facts built by hand can still carry underscores
        let facts = PlatformFacts {
            major_version: 7,
            build_architecture: "x86_64".into(),
            product_version: "1.0.0".into(),
        };
        let name = release_name(&facts);
        assert!(name.ends_with("-x86-64"));
        assert!(!name.contains('_'));
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name(6), "pxf-gp6");
        assert_eq!(package_name(7), "pxf-gp7");
    }

    #[test]
    fn test_snapshot_version_split() {
        let v = PackageVersion::from_product_version("1.2.3-SNAPSHOT");
        assert_eq!(v.main_version, "1.2.3");
        assert_eq!(v.release_tag, "SNAPSHOT");
        assert_eq!(v.full(), "1.2.3-SNAPSHOT");
    }

    #[test]
    fn test_final_version_split() {
        let v = PackageVersion::from_product_version("1.2.3");
        assert_eq!(v.main_version, "1.2.3");
        assert_eq!(v.release_tag, "1");
    }

    #[test]
    fn test_other_prerelease_suffix_is_snapshot() {
        let v = PackageVersion::from_product_version("6.10.0-rc1");
        assert_eq!(v.main_version, "6.10.0");
        assert_eq!(v.release_tag, "SNAPSHOT");
    }
}

//! Configuration management for pxfbuild.
//!
//! Reads configuration from a .env file at the repository root and from
//! environment variables. Environment variables take precedence over .env.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default license string written into the RPM spec.
pub const DEFAULT_LICENSE: &str = "ASL 2.0";

/// Default vendor string (also the default DEB maintainer).
pub const DEFAULT_VENDOR: &str = "Open Source";

/// pxfbuild configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository root (contains `version`, `package/` and the module dirs)
    pub repo_root: PathBuf,
    /// License string for the RPM spec
    pub license: String,
    /// Vendor string for the RPM spec
    pub vendor: String,
    /// Maintainer for the DEB control file
    pub maintainer: String,
    /// Opaque platform coordinate consumed only by `gppkg-rpm`
    pub gppkg_os: Option<String>,
    /// Host platform version-reporting tool
    pub version_tool: String,
    /// Forced platform major version (skips the version tool)
    pub major_version_override: Option<String>,
    /// Forced build architecture token
    pub build_arch_override: Option<String>,
    /// Forced OS tag for DEB metadata
    pub os_tag_override: Option<String>,
    /// Forced commit identifier
    pub commit_override: Option<String>,
    /// Program used to run module operations
    pub make: String,
    /// Per-operation timeout for module collaborators
    pub module_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from `<repo_root>/.env` and the environment.
    pub fn load(repo_root: &Path) -> Self {
        let mut vars = HashMap::new();

        let env_path = repo_root.join(".env");
        if env_path.exists() {
            match dotenvy::from_path_iter(&env_path) {
                Ok(iter) => {
                    for item in iter {
                        match item {
                            Ok((key, value)) => {
                                vars.insert(key, value);
                            }
                            Err(e) => tracing::warn!("skipping malformed .env line: {}", e),
                        }
                    }
                }
                Err(e) => tracing::warn!("cannot read {}: {}", env_path.display(), e),
            }
        }

        // Environment variables override .env file
        vars.extend(std::env::vars());

        Self::from_vars(repo_root, &vars)
    }

    /// Build configuration from an explicit variable map.
    pub fn from_vars(repo_root: &Path, vars: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let vendor = get("VENDOR").unwrap_or_else(|| DEFAULT_VENDOR.to_string());
        let maintainer = get("MAINTAINER").unwrap_or_else(|| vendor.clone());

        let module_timeout = get("MODULE_TIMEOUT_SECS").and_then(|s| match s.parse::<u64>() {
            Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
            _ => {
                tracing::warn!("ignoring invalid MODULE_TIMEOUT_SECS={}", s);
                None
            }
        });

        Self {
            repo_root: repo_root.to_path_buf(),
            license: get("LICENSE").unwrap_or_else(|| DEFAULT_LICENSE.to_string()),
            vendor,
            maintainer,
            gppkg_os: get("GPPKG_OS"),
            version_tool: get("PG_CONFIG").unwrap_or_else(|| "pg_config".to_string()),
            major_version_override: get("GP_MAJOR_VERSION"),
            build_arch_override: get("BUILD_ARCH"),
            os_tag_override: get("OS_TAG"),
            commit_override: get("GIT_COMMIT"),
            make: get("MAKE").unwrap_or_else(|| "make".to_string()),
            module_timeout,
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  REPO_ROOT: {}", self.repo_root.display());
        println!("  LICENSE: {}", self.license);
        println!("  VENDOR: {}", self.vendor);
        println!("  MAINTAINER: {}", self.maintainer);
        println!("  PG_CONFIG: {}", self.version_tool);
        println!("  MAKE: {}", self.make);
        match &self.gppkg_os {
            Some(os) => println!("  GPPKG_OS: {}", os),
            None => println!("  GPPKG_OS: (unset, gppkg-rpm unavailable)"),
        }
        if let Some(major) = &self.major_version_override {
            println!("  GP_MAJOR_VERSION: {} (override)", major);
        }
        if let Some(arch) = &self.build_arch_override {
            println!("  BUILD_ARCH: {} (override)", arch);
        }
        if let Some(timeout) = self.module_timeout {
            println!("  MODULE_TIMEOUT_SECS: {}", timeout.as_secs());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(Path::new("/repo"), &HashMap::new());
        assert_eq!(config.license, DEFAULT_LICENSE);
        assert_eq!(config.vendor, DEFAULT_VENDOR);
        assert_eq!(config.maintainer, DEFAULT_VENDOR);
        assert_eq!(config.version_tool, "pg_config");
        assert_eq!(config.make, "make");
        assert!(config.gppkg_os.is_none());
        assert!(config.module_timeout.is_none());
    }

    #[test]
    fn test_maintainer_defaults_to_vendor() {
        let config = Config::from_vars(Path::new("/repo"), &vars(&[("VENDOR", "Acme")]));
        assert_eq!(config.maintainer, "Acme");

        let config = Config::from_vars(
            Path::new("/repo"),
            &vars(&[("VENDOR", "Acme"), ("MAINTAINER", "ops@acme.test")]),
        );
        assert_eq!(config.maintainer, "ops@acme.test");
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = Config::from_vars(Path::new("/repo"), &vars(&[("LICENSE", "   ")]));
        assert_eq!(config.license, DEFAULT_LICENSE);
    }

    #[test]
    fn test_module_timeout_parsing() {
        let config = Config::from_vars(Path::new("/repo"), &vars(&[("MODULE_TIMEOUT_SECS", "90")]));
        assert_eq!(config.module_timeout, Some(Duration::from_secs(90)));

        let config = Config::from_vars(Path::new("/repo"), &vars(&[("MODULE_TIMEOUT_SECS", "soon")]));
        assert!(config.module_timeout.is_none());
    }

    #[test]
    #[serial]
    fn test_env_overrides_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "# release settings\nVENDOR=\"From File\"\nGPPKG_OS=rhel8\n",
        )
        .unwrap();

        std::env::remove_var("VENDOR");
        std::env::set_var("GPPKG_OS", "rhel9");
        let config = Config::load(dir.path());
        std::env::remove_var("GPPKG_OS");

        assert_eq!(config.vendor, "From File");
        assert_eq!(config.gppkg_os.as_deref(), Some("rhel9"));
    }
}

//! Shared test utilities for pxfbuild tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use pxfbuild::commands::Session;
use pxfbuild::config::Config;
use pxfbuild::module::{self, Module, ModuleRunner, Operation};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const RPM_SPEC: &str = "Name: @NAME@\nVersion: @VERSION@\nRelease: @RELEASE@%{?dist}\n\
                            License: @LICENSE@\nVendor: @VENDOR@\n\
                            Requires: greenplum-db-@GP_MAJOR@\n";

pub const DEB_CONTROL: &str = "Package: %NAME%\nVersion: %VERSION%\nArchitecture: %ARCH%\n\
                               Maintainer: %MAINTAINER%\nX-Os-Tag: %OS_TAG%\n";

pub const GPPKG_SPEC: &str = "PkgName: pxf\nVersion: #gppkgver\nGPDBVersion: #gpver\n\
                              Architecture: #arch\nOS: #os\n";

/// A throwaway repository checkout: `version`, `package/` and one directory
/// (with a Makefile) per module.
pub struct TestRepo {
    /// Temporary directory (kept alive for lifetime of TestRepo)
    pub _temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestRepo {
    pub fn new(version: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();

        fs::write(root.join("version"), format!("{}\n", version)).unwrap();
        for module in module::modules() {
            let dir = module.source_path(&root);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("Makefile"), "build:\n\ttrue\n").unwrap();
        }

        let package = root.join("package");
        fs::create_dir_all(package.join("DEBIAN")).unwrap();
        for installer in ["install_binary", "install_rpm", "install_deb"] {
            fs::write(
                package.join(installer),
                format!("#!/bin/sh\necho {}\n", installer),
            )
            .unwrap();
        }
        fs::write(package.join("pxf.spec.in"), RPM_SPEC).unwrap();
        fs::write(package.join("DEBIAN/control"), DEB_CONTROL).unwrap();
        fs::write(package.join("DEBIAN/postinst"), "#!/bin/sh\nexit 0\n").unwrap();
        fs::write(package.join("gppkg_spec.yml.in"), GPPKG_SPEC).unwrap();

        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Configuration pinned to `major` so no host tools are consulted.
    pub fn config(&self, major: u32, extra: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = [
            ("GP_MAJOR_VERSION", major.to_string()),
            ("BUILD_ARCH", "x86_64".to_string()),
            ("GIT_COMMIT", "0123abcd".to_string()),
            ("OS_TAG", "ubuntu18.04".to_string()),
            ("VENDOR", "Test Vendor".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        Config::from_vars(&self.root, &vars)
    }

    pub fn session(&self, major: u32, runner: &MockRunner) -> Session {
        self.session_with(major, &[], runner)
    }

    pub fn session_with(&self, major: u32, extra: &[(&str, &str)], runner: &MockRunner) -> Session {
        Session::open(self.config(major, extra), Box::new(runner.clone()))
            .expect("Failed to open session")
    }

    pub fn build_root(&self) -> PathBuf {
        self.root.join("build")
    }
}

/// Stands in for the module makefiles.
///
/// `build` populates the module's output directory; every call is recorded.
/// Clones share their call log.
#[derive(Clone, Default)]
pub struct MockRunner {
    repo_root: PathBuf,
    calls: Arc<Mutex<Vec<(String, Operation)>>>,
    failing: Vec<(&'static str, Operation)>,
    no_output: Vec<&'static str>,
}

impl MockRunner {
    pub fn new(repo: &TestRepo) -> Self {
        Self {
            repo_root: repo.root.clone(),
            ..Default::default()
        }
    }

    /// Make `op` fail for module `name`.
    pub fn fail_on(mut self, name: &'static str, op: Operation) -> Self {
        self.failing.push((name, op));
        self
    }

    /// Succeed building `name` without producing its output directory.
    pub fn without_output(mut self, name: &'static str) -> Self {
        self.no_output.push(name);
        self
    }

    pub fn calls(&self) -> Vec<(String, Operation)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, name: &str, op: Operation) -> bool {
        self.calls().iter().any(|(n, o)| n == name && *o == op)
    }

    pub fn modules_for(&self, op: Operation) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(_, o)| *o == op)
            .map(|(n, _)| n)
            .collect()
    }

    fn populate(&self, module: &Module) {
        let out = module.output_path(&self.repo_root);
        fs::create_dir_all(out.join("lib")).unwrap();
        fs::create_dir_all(out.join("conf")).unwrap();
        fs::write(out.join("lib").join(format!("{}.jar", module.name)), module.name).unwrap();
        // Every module ships the same conf file; the last one staged wins
        fs::write(out.join("conf/pxf-env.sh"), format!("# from {}\n", module.name)).unwrap();
    }
}

impl ModuleRunner for MockRunner {
    fn run(&self, module: &Module, op: Operation) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((module.name.to_string(), op));

        if self.failing.contains(&(module.name, op)) {
            bail!("make {} failed in {}", op, module.dir);
        }
        if op == Operation::Build && !self.no_output.contains(&module.name) {
            self.populate(module);
        }
        Ok(())
    }
}

/// Relative path -> contents (symlinks as their target) for every file.
pub fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| !e.file_type().is_dir())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap().to_string_lossy().into_owned();
            let content = if e.file_type().is_symlink() {
                fs::read_link(e.path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
                    .into_bytes()
            } else {
                fs::read(e.path()).unwrap()
            };
            (rel, content)
        })
        .collect()
}

/// Entry names of a `.tar.gz`, in archive order.
pub fn tar_entries(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    archive
        .entries()
        .unwrap()
        .map(|e| {
            e.unwrap()
                .path()
                .unwrap()
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string()
        })
        .collect()
}

/// Write an executable shell script.
pub fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Prepends a directory to PATH and restores the old value on drop.
pub struct PathGuard {
    old: Option<std::ffi::OsString>,
}

impl PathGuard {
    pub fn prepend(dir: &Path) -> Self {
        let old = std::env::var_os("PATH");
        let mut paths = vec![dir.to_path_buf()];
        if let Some(old) = &old {
            paths.extend(std::env::split_paths(old));
        }
        std::env::set_var("PATH", std::env::join_paths(paths).unwrap());
        Self { old }
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        match &self.old {
            Some(old) => std::env::set_var("PATH", old),
            None => std::env::remove_var("PATH"),
        }
    }
}

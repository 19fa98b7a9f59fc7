//! Module graph - the four buildable units of the product.
//!
//! Modules are static data describing WHERE a unit lives and WHAT it
//! produces. HOW an operation runs belongs to the module's own makefile,
//! reached through a [`ModuleRunner`].
//!
//! Declaration order is the staging order: both extensions come before the
//! CLI and the server. Modules have no compile dependency on each other, so
//! the order only matters for deterministic staging.

use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gate::{FeatureGates, GateId};
use crate::process::Cmd;

/// What kind of unit a module is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Database extension.
    Extension,
    /// Command-line tool.
    Cli,
    /// Server.
    Server,
}

/// A buildable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Name, also the CLI subcommand that builds it.
    pub name: &'static str,
    pub kind: ModuleKind,
    /// Source directory relative to the repository root.
    pub dir: &'static str,
    /// Populated by a successful `build`, relative to the repository root.
    pub output_dir: &'static str,
    /// Subdirectory of the DEB install prefix the output lands in.
    pub deb_subdir: &'static str,
    /// Gate that decides whether the module is built at all.
    pub gate: Option<GateId>,
    /// Gate that decides whether a built module is staged and packaged.
    pub package_gate: Option<GateId>,
}

impl Module {
    /// Absolute source directory.
    pub fn source_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(self.dir)
    }

    /// Absolute output directory.
    pub fn output_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(self.output_dir)
    }

    pub fn is_extension(&self) -> bool {
        self.kind == ModuleKind::Extension
    }

    /// Why the module stays out of staged trees and packages, if it does.
    /// A module that was never built reports its build gate.
    pub fn package_skip_reason<'a>(&self, gates: &'a FeatureGates) -> Option<&'a str> {
        gates
            .skip_reason(self.gate)
            .or_else(|| gates.skip_reason(self.package_gate))
    }
}

/// Always-active extension.
pub const EXTERNAL_TABLE: Module = Module {
    name: "external-table",
    kind: ModuleKind::Extension,
    dir: "external-table",
    output_dir: "external-table/build/stage",
    deb_subdir: "gpextable",
    gate: None,
    package_gate: None,
};

/// Foreign-data-wrapper extension, only buildable on newer platforms.
pub const FDW: Module = Module {
    name: "fdw",
    kind: ModuleKind::Extension,
    dir: "fdw",
    output_dir: "fdw/build/stage",
    deb_subdir: "fdw",
    gate: Some(GateId::FdwBuild),
    package_gate: Some(GateId::FdwPackage),
};

pub const CLI: Module = Module {
    name: "cli",
    kind: ModuleKind::Cli,
    dir: "cli",
    output_dir: "cli/build/stage",
    deb_subdir: "",
    gate: None,
    package_gate: None,
};

pub const SERVER: Module = Module {
    name: "server",
    kind: ModuleKind::Server,
    dir: "server",
    output_dir: "server/build/stage",
    deb_subdir: "",
    gate: None,
    package_gate: None,
};

static MODULES: [Module; 4] = [EXTERNAL_TABLE, FDW, CLI, SERVER];

/// All modules in declaration order.
pub fn modules() -> &'static [Module] {
    &MODULES
}

/// The extension modules, in declaration order.
pub fn extensions() -> impl Iterator<Item = &'static Module> {
    modules().iter().filter(|m| m.is_extension())
}

/// Look a module up by name.
pub fn find(name: &str) -> Option<&'static Module> {
    modules().iter().find(|m| m.name == name)
}

/// The uniform operation contract every module exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Build,
    Clean,
    Install,
    Test,
}

impl Operation {
    /// Name the collaborator is invoked with.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Build => "build",
            Operation::Clean => "clean",
            Operation::Install => "install",
            Operation::Test => "test",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs one operation of one module. Implementations must be callable from
/// several threads at once (tests and cleans run in parallel).
pub trait ModuleRunner: Sync {
    fn run(&self, module: &Module, op: Operation) -> Result<()>;
}

/// Runs module operations through each module's makefile:
/// `make -C <repo>/<module dir> <operation>`.
#[derive(Debug, Clone)]
pub struct MakeRunner {
    repo_root: PathBuf,
    make: String,
    timeout: Option<Duration>,
}

impl MakeRunner {
    pub fn new(repo_root: &Path, make: &str, timeout: Option<Duration>) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            make: make.to_string(),
            timeout,
        }
    }

    fn command(&self, module: &Module, op: Operation) -> Cmd {
        Cmd::new(&self.make)
            .arg("-C")
            .arg_path(&module.source_path(&self.repo_root))
            .arg(op.name())
            .timeout(self.timeout)
            .error_msg(format!("make {} in {} failed", op, module.dir))
    }
}

impl ModuleRunner for MakeRunner {
    fn run(&self, module: &Module, op: Operation) -> Result<()> {
        match op {
            // Sequential and long-running: stream output to the terminal
            Operation::Build | Operation::Install => {
                self.command(module, op).run_interactive()?;
            }
            // May run concurrently: capture output so it does not interleave
            Operation::Test | Operation::Clean => {
                let result = self.command(module, op).run()?;
                tracing::debug!(module = module.name, %op, stdout = %result.stdout_trimmed());
            }
        }
        Ok(())
    }
}

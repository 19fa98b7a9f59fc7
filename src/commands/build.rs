//! Build, install and test commands.

use crate::error::Result;
use crate::module::Module;
use crate::report::{BuildReport, InstallReport, TestReport};
use crate::timing::Timer;

use super::Session;

/// What `build` covers.
#[derive(Debug, Clone, Copy)]
pub enum BuildTarget {
    /// Every module (`all`)
    All,
    /// The two extensions
    Extensions,
    /// One named module
    Module(&'static Module),
}

/// What `install` covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallTarget {
    All,
    Server,
}

/// Build modules. Fails on the first module failure.
pub fn cmd_build(session: &Session, target: BuildTarget) -> Result<BuildReport> {
    let executor = session.executor();
    let timer = Timer::start("build");
    let report = match target {
        BuildTarget::All => {
            println!("=== Building all modules ===");
            executor.build_all()
        }
        BuildTarget::Extensions => {
            println!("=== Building extensions ===");
            executor.build_extensions()
        }
        BuildTarget::Module(module) => {
            println!("=== Building {} ===", module.name);
            executor.build_module(module)
        }
    };
    timer.finish();
    report.into_result()
}

/// Install modules. Fails on the first module failure.
pub fn cmd_install(session: &Session, target: InstallTarget) -> Result<InstallReport> {
    let executor = session.executor();
    let report = match target {
        InstallTarget::All => {
            println!("=== Installing all modules ===");
            executor.install_all()
        }
        InstallTarget::Server => {
            println!("=== Installing server ===");
            executor.install_server()
        }
    };
    report.into_result()
}

/// Test every testable module; all are attempted before the first failure
/// is reported.
pub fn cmd_test(session: &Session) -> Result<TestReport> {
    println!("=== Testing modules ===\n");
    let report = session.executor().test_all();
    report.print();
    report.into_result()
}

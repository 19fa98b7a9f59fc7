//! CLI command handlers.
//!
//! Each submodule handles one group of subcommands:
//! - `build` - build, install and test modules
//! - `clean` - clean modules and remove `build/`
//! - `package` - stage and produce release artifacts
//! - `preflight` - check host tools and repository inputs
//!
//! Most handlers take a [`Session`], which carries everything resolved once
//! per invocation: configuration, build paths, platform facts and gates.
//! `clean` and `preflight` take the configuration alone.

pub mod build;
pub mod clean;
pub mod package;
mod preflight;

pub use build::{cmd_build, cmd_install, cmd_test, BuildTarget, InstallTarget};
pub use clean::cmd_clean;
pub use package::{cmd_package, PackageOutput, PackageTarget};
pub use preflight::cmd_preflight;

use crate::config::Config;
use crate::error::Result;
use crate::executor::BuildExecutor;
use crate::facts::{self, PlatformFacts};
use crate::gate::FeatureGates;
use crate::layout::BuildLayout;
use crate::module::ModuleRunner;

/// State shared by every handler in one invocation.
pub struct Session {
    pub config: Config,
    pub layout: BuildLayout,
    pub facts: PlatformFacts,
    pub gates: FeatureGates,
    runner: Box<dyn ModuleRunner>,
}

impl Session {
    /// Resolve platform facts and evaluate gates.
    ///
    /// Fails with an environment error before anything is written.
    pub fn open(config: Config, runner: Box<dyn ModuleRunner>) -> Result<Self> {
        let layout = BuildLayout::new(&config.repo_root);
        let facts = facts::resolve(&config, &layout)?;
        Ok(Self::with_facts(config, facts, runner))
    }

    /// Build a session from already-known facts.
    pub fn with_facts(config: Config, facts: PlatformFacts, runner: Box<dyn ModuleRunner>) -> Self {
        let layout = BuildLayout::new(&config.repo_root);
        let gates = FeatureGates::evaluate(&facts);
        tracing::debug!(
            ?facts,
            fdw_build = gates.fdw_build.is_active(),
            fdw_package = gates.fdw_package.is_active(),
            "session opened"
        );
        Self {
            config,
            layout,
            facts,
            gates,
            runner,
        }
    }

    pub fn executor(&self) -> BuildExecutor<'_> {
        BuildExecutor::new(self.runner.as_ref(), &self.gates)
    }
}

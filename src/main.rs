//! pxfbuild - builds, tests and packages PXF for Greenplum.
//!
//! Modules are built through their makefiles, merged into one staged tree
//! under `build/stage/`, and packaged as a tarball, RPM or DEB.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use pxfbuild::commands::{self, BuildTarget, InstallTarget, PackageTarget, Session};
use pxfbuild::config::Config;
use pxfbuild::module::{self, MakeRunner};
use pxfbuild::Error;

#[derive(Parser)]
#[command(name = "pxfbuild")]
#[command(about = "PXF build and release orchestrator")]
#[command(
    after_help = "QUICK START:\n  pxfbuild preflight  Check host tools and inputs\n  pxfbuild all        Build every module\n  pxfbuild tar        Build, stage and create the release tarball\n  pxfbuild clean      Clean modules and remove build/"
)]
struct Cli {
    /// Repository root (holds `version`, `package/` and the module directories)
    #[arg(long, global = true, default_value = ".")]
    repo_root: PathBuf,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every module (gated modules are skipped)
    All,
    /// Build the external-table and fdw extensions
    Extensions,
    /// Build the external-table extension
    #[command(name = "external-table")]
    ExternalTable,
    /// Build the fdw extension (skipped below platform version 6)
    Fdw,
    /// Build the command-line tool
    Cli,
    /// Build the server
    Server,
    /// Clean every module and remove build/
    Clean,
    /// Run module tests in parallel
    Test,
    /// Install every active module
    Install,
    /// Install only the server
    InstallServer,
    /// Build all modules and assemble the staged tree
    Stage,
    /// Create the release tarball
    Tar,
    /// Create the RPM (platform version 7 and later)
    Rpm,
    /// Create the RPM and its installer bundle
    RpmTar,
    /// Create the DEB
    Deb,
    /// Create the DEB and its installer bundle
    DebTar,
    /// Create the RPM and wrap it with gppkg (needs GPPKG_OS)
    GppkgRpm,
    /// Check host tools and repository inputs
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<Error>() {
            Some(Error::GateSkipped { reason, .. }) => {
                println!("[SKIP] {}", reason);
                ExitCode::SUCCESS
            }
            _ => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let repo_root = std::fs::canonicalize(&cli.repo_root)
        .with_context(|| format!("repository root {} not found", cli.repo_root.display()))?;
    let config = Config::load(&repo_root);

    if let Commands::Preflight { strict } = cli.command {
        return commands::cmd_preflight(&config, strict);
    }

    let runner = MakeRunner::new(&repo_root, &config.make, config.module_timeout);
    if let Commands::Clean = cli.command {
        commands::cmd_clean(&config, &runner);
        return Ok(());
    }

    let session = Session::open(config, Box::new(runner))?;
    session.facts.print();
    println!();

    match cli.command {
        Commands::All => {
            commands::cmd_build(&session, BuildTarget::All)?;
        }
        Commands::Extensions => {
            commands::cmd_build(&session, BuildTarget::Extensions)?;
        }
        Commands::ExternalTable => {
            commands::cmd_build(&session, BuildTarget::Module(&module::EXTERNAL_TABLE))?;
        }
        Commands::Fdw => {
            commands::cmd_build(&session, BuildTarget::Module(&module::FDW))?;
        }
        Commands::Cli => {
            commands::cmd_build(&session, BuildTarget::Module(&module::CLI))?;
        }
        Commands::Server => {
            commands::cmd_build(&session, BuildTarget::Module(&module::SERVER))?;
        }
        Commands::Test => {
            commands::cmd_test(&session)?;
        }
        Commands::Install => {
            commands::cmd_install(&session, InstallTarget::All)?;
        }
        Commands::InstallServer => {
            commands::cmd_install(&session, InstallTarget::Server)?;
        }
        Commands::Stage => {
            commands::cmd_package(&session, PackageTarget::Stage)?;
        }
        Commands::Tar => {
            commands::cmd_package(&session, PackageTarget::Tar)?;
        }
        Commands::Rpm => {
            commands::cmd_package(&session, PackageTarget::Rpm)?;
        }
        Commands::RpmTar => {
            commands::cmd_package(&session, PackageTarget::RpmTar)?;
        }
        Commands::Deb => {
            commands::cmd_package(&session, PackageTarget::Deb)?;
        }
        Commands::DebTar => {
            commands::cmd_package(&session, PackageTarget::DebTar)?;
        }
        Commands::GppkgRpm => {
            commands::cmd_package(&session, PackageTarget::GppkgRpm)?;
        }
        // Handled before facts are resolved
        Commands::Preflight { .. } | Commands::Clean => {}
    }

    Ok(())
}

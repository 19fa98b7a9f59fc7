//! Build executor - walks the module graph and invokes module operations.
//!
//! - `build` and `install` are sequential and fail-fast: later stages assume
//!   every earlier module either succeeded or was deliberately skipped.
//! - `test` and `clean` have no ordering dependency and run in parallel;
//!   every module is attempted and the results are aggregated.
//!
//! Nothing is retried here. A collaborator timeout is a failure like any
//! other.

use std::thread;

use crate::clean;
use crate::gate::FeatureGates;
use crate::layout::BuildLayout;
use crate::module::{self, Module, ModuleRunner, Operation};
use crate::report::{
    BuildReport, CleanReport, InstallReport, OperationReport, Outcome, TestReport,
};
use crate::timing::Timer;

/// Drives module operations for one invocation.
pub struct BuildExecutor<'a> {
    runner: &'a dyn ModuleRunner,
    gates: &'a FeatureGates,
}

impl<'a> BuildExecutor<'a> {
    pub fn new(runner: &'a dyn ModuleRunner, gates: &'a FeatureGates) -> Self {
        Self { runner, gates }
    }

    /// Build every module in declaration order.
    pub fn build_all(&self) -> BuildReport {
        self.build_modules(module::modules().iter())
    }

    /// Build only the extension modules.
    pub fn build_extensions(&self) -> BuildReport {
        self.build_modules(module::extensions())
    }

    /// Build a single module (its gate still applies).
    pub fn build_module(&self, module: &'static Module) -> BuildReport {
        self.build_modules(std::iter::once(module))
    }

    fn build_modules(&self, modules: impl Iterator<Item = &'static Module>) -> BuildReport {
        let mut report = OperationReport::new(Operation::Build);

        for module in modules {
            if let Some(reason) = self.gates.skip_reason(module.gate) {
                println!("[SKIP] {}: {}", module.name, reason);
                report.push(module.name, Outcome::Skipped(reason.to_string()));
                continue;
            }

            if !self.invoke(module, Operation::Build, &mut report) {
                break;
            }
        }

        report
    }

    /// Install every active module; inactive gated modules are dropped first.
    pub fn install_all(&self) -> InstallReport {
        let active: Vec<&'static Module> = module::modules()
            .iter()
            .filter(|m| {
                let reason = self.gates.skip_reason(m.gate);
                if let Some(reason) = reason {
                    println!("[SKIP] {} install: {}", m.name, reason);
                }
                reason.is_none()
            })
            .collect();
        self.install_modules(&active)
    }

    /// Install only the server module.
    pub fn install_server(&self) -> InstallReport {
        self.install_modules(&[&module::SERVER])
    }

    fn install_modules(&self, modules: &[&'static Module]) -> InstallReport {
        let mut report = OperationReport::new(Operation::Install);
        for &module in modules {
            if !self.invoke(module, Operation::Install, &mut report) {
                break;
            }
        }
        report
    }

    /// Run a fail-fast operation on one module. Returns false on failure.
    fn invoke(&self, module: &Module, op: Operation, report: &mut OperationReport) -> bool {
        println!("\n{} {}...", capitalize(op.name()), module.name);
        let timer = Timer::start(&format!("{} {}", op, module.name));

        match self.runner.run(module, op) {
            Ok(()) => {
                timer.finish();
                report.push(module.name, Outcome::Succeeded);
                true
            }
            Err(e) => {
                let message = format!("{:#}", e);
                eprintln!("[FAIL] {} {}: {}", op, module.name, message);
                report.push(module.name, Outcome::Failed(message));
                false
            }
        }
    }

    /// Test the CLI, the server, and the gated extension when its gate is
    /// active. The always-on extension carries no test suite of its own.
    pub fn test_all(&self) -> TestReport {
        let mut report = OperationReport::new(Operation::Test);
        let mut selected = Vec::new();

        for module in module::modules() {
            if module.is_extension() && module.gate.is_none() {
                continue;
            }
            match self.gates.skip_reason(module.gate) {
                Some(reason) => {
                    println!("[SKIP] {} tests: {}", module.name, reason);
                    selected.push((module, Some(reason.to_string())));
                }
                None => selected.push((module, None)),
            }
        }

        let outcomes = run_parallel(
            self.runner,
            selected
                .iter()
                .filter(|(_, skip)| skip.is_none())
                .map(|(m, _)| *m),
            Operation::Test,
        );

        let mut outcomes = outcomes.into_iter();
        for (module, skip) in selected {
            let outcome = match skip {
                Some(reason) => Outcome::Skipped(reason),
                None => outcomes
                    .next()
                    .map(|(_, outcome)| outcome)
                    .unwrap_or(Outcome::Failed("test was not run".into())),
            };
            report.push(module.name, outcome);
        }

        report
    }
}

/// Clean every module regardless of gating, then remove the build root.
///
/// Needs no platform facts, so it works on a host whose version tool is
/// missing. Best-effort: failures become warnings and never stop the
/// remaining cleans.
pub fn clean_all(runner: &dyn ModuleRunner, layout: &BuildLayout) -> CleanReport {
    let mut report = OperationReport::new(Operation::Clean);

    for (name, outcome) in run_parallel(runner, module::modules().iter(), Operation::Clean) {
        if let Outcome::Failed(msg) = &outcome {
            report.warnings.push(format!("clean {}: {}", name, msg));
        }
        report.push(name, outcome);
    }

    if let Err(e) = clean::clean_outputs(layout) {
        report.warnings.push(format!("{:#}", e));
    }

    report
}

/// Run `op` on every module concurrently; results come back in input
/// order regardless of completion order.
fn run_parallel<'m>(
    runner: &dyn ModuleRunner,
    modules: impl Iterator<Item = &'m Module>,
    op: Operation,
) -> Vec<(&'static str, Outcome)> {
    let modules: Vec<&Module> = modules.collect();

    thread::scope(|scope| {
        let handles: Vec<_> = modules
            .iter()
            .map(|&module| scope.spawn(move || runner.run(module, op)))
            .collect();

        modules
            .iter()
            .zip(handles)
            .map(|(module, handle)| {
                let outcome = match handle.join() {
                    Ok(Ok(())) => Outcome::Succeeded,
                    Ok(Err(e)) => Outcome::Failed(format!("{:#}", e)),
                    Err(_) => Outcome::Failed(format!("{} {} panicked", op, module.name)),
                };
                (module.name, outcome)
            })
            .collect()
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

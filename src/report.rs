//! Per-module outcome reports.
//!
//! Fail-fast operations (build, install) and best-effort ones (test, clean)
//! both produce an [`OperationReport`]; they differ only in whether the
//! executor keeps going after a failure.

use crate::error::{Error, Result};
use crate::module::Operation;

/// What happened to one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Deliberately omitted; carries the gate's skip reason.
    Skipped(String),
    /// The collaborator failed; carries its error message.
    Failed(String),
}

/// Outcome for a named module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleResult {
    pub module: &'static str,
    pub outcome: Outcome,
}

/// Aggregated outcomes of one operation across modules, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    pub operation: Operation,
    pub results: Vec<ModuleResult>,
    /// Non-module problems (e.g. removing the build root during clean).
    pub warnings: Vec<String>,
}

/// Result of `build_all` and single-module builds.
pub type BuildReport = OperationReport;
/// Result of `install_all`.
pub type InstallReport = OperationReport;
/// Result of `test_all`.
pub type TestReport = OperationReport;
/// Result of `clean_all`.
pub type CleanReport = OperationReport;

impl OperationReport {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            results: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push(&mut self, module: &'static str, outcome: Outcome) {
        self.results.push(ModuleResult { module, outcome });
    }

    /// True when no module failed and there are no warnings.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none() && self.warnings.is_empty()
    }

    /// Modules that failed, with their messages.
    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            Outcome::Failed(msg) => Some((r.module, msg.as_str())),
            _ => None,
        })
    }

    /// Modules that were skipped, with their reasons.
    pub fn skipped(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            Outcome::Skipped(reason) => Some((r.module, reason.as_str())),
            _ => None,
        })
    }

    /// Outcome recorded for `module`, if it was reached at all.
    pub fn outcome(&self, module: &str) -> Option<&Outcome> {
        self.results
            .iter()
            .find(|r| r.module == module)
            .map(|r| &r.outcome)
    }

    /// Convert the first failure into a [`Error::ModuleOperation`].
    pub fn into_result(self) -> Result<Self> {
        if let Some((module, message)) = self.failures().next() {
            return Err(Error::ModuleOperation {
                module: module.to_string(),
                operation: self.operation.to_string(),
                message: message.to_string(),
            });
        }
        Ok(self)
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== {} results ===\n", self.operation);

        for result in &self.results {
            match &result.outcome {
                Outcome::Succeeded => println!("  ✓ [PASS] {}", result.module),
                Outcome::Skipped(reason) => println!("  ○ [SKIP] {}: {}", result.module, reason),
                Outcome::Failed(msg) => {
                    let first_line = msg.lines().next().unwrap_or_default();
                    println!("  ✗ [FAIL] {}: {}", result.module, first_line);
                }
            }
        }
        for warning in &self.warnings {
            println!("  ⚠ [WARN] {}", warning);
        }

        println!();
        let passed = self
            .results
            .iter()
            .filter(|r| r.outcome == Outcome::Succeeded)
            .count();
        let failed = self.failures().count();
        println!("Summary: {}/{} succeeded", passed, self.results.len());
        if failed > 0 {
            println!("         {} FAILED", failed);
        }
    }
}

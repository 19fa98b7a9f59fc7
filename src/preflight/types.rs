//! Check results and the aggregated report.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    /// Something a release needs is missing or broken.
    Fail,
    /// Only some packaging targets are affected.
    Warn,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            details,
        }
    }

    pub fn pass(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Pass, Some(details.into()))
    }

    pub fn fail(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Fail, Some(details.into()))
    }

    pub fn warn(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warn, Some(details.into()))
    }

    /// `Fail` when `required`, otherwise `Warn`.
    pub fn missing(name: &str, required: bool, details: impl Into<String>) -> Self {
        if required {
            Self::fail(name, details)
        } else {
            Self::warn(name, details)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    pub fn all_passed(&self) -> bool {
        self.fail_count() == 0
    }

    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn warn_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn print(&self) {
        println!("=== Preflight ===\n");

        for check in &self.checks {
            let (icon, label) = match check.status {
                CheckStatus::Pass => ("✓", "PASS"),
                CheckStatus::Fail => ("✗", "FAIL"),
                CheckStatus::Warn => ("⚠", "WARN"),
            };
            match &check.details {
                Some(details) => println!("  {} [{}] {}: {}", icon, label, check.name, details),
                None => println!("  {} [{}] {}", icon, label, check.name),
            }
        }

        println!();
        println!(
            "Summary: {}/{} passed",
            self.count(CheckStatus::Pass),
            self.checks.len()
        );
        if self.fail_count() > 0 {
            println!("         {} FAILED - releases cannot be produced", self.fail_count());
        }
        if self.warn_count() > 0 {
            println!("         {} warnings", self.warn_count());
        }
    }
}

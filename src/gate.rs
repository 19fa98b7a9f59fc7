//! Platform-version feature gates.
//!
//! Gates are evaluated exactly once from [`PlatformFacts`] and then passed
//! around as data, so the build step and the packaging step can never reach
//! different conclusions about the same module.

use std::fmt;

use crate::error::{Error, Result};
use crate::facts::PlatformFacts;

/// Minimum platform major version that can build the fdw extension.
pub const FDW_BUILD_MIN_MAJOR: u32 = 6;

/// Minimum platform major version whose packages ship the fdw extension.
pub const FDW_PACKAGE_MIN_MAJOR: u32 = 7;

/// The known gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateId {
    FdwBuild,
    FdwPackage,
}

impl GateId {
    pub fn name(self) -> &'static str {
        match self {
            GateId::FdwBuild => "fdw-build",
            GateId::FdwPackage => "fdw-package",
        }
    }

    pub fn minimum_major_version(self) -> u32 {
        match self {
            GateId::FdwBuild => FDW_BUILD_MIN_MAJOR,
            GateId::FdwPackage => FDW_PACKAGE_MIN_MAJOR,
        }
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An evaluated version-threshold rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGate {
    pub id: GateId,
    pub minimum_major_version: u32,
    /// Populated iff the gate is inactive.
    pub skip_reason: Option<String>,
}

impl FeatureGate {
    /// Evaluate `id` against a platform major version.
    pub fn evaluate(id: GateId, major_version: u32) -> Self {
        let threshold = id.minimum_major_version();
        let skip_reason = (major_version < threshold).then(|| {
            format!(
                "platform version {} is less than {}.",
                major_version, threshold
            )
        });
        Self {
            id,
            minimum_major_version: threshold,
            skip_reason,
        }
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn is_active(&self) -> bool {
        self.skip_reason.is_none()
    }

    /// `Ok(())` when active, otherwise the informational skip error.
    pub fn check(&self) -> Result<()> {
        match &self.skip_reason {
            None => Ok(()),
            Some(reason) => Err(Error::GateSkipped {
                gate: self.name().to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

/// All gate decisions for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGates {
    pub fdw_build: FeatureGate,
    pub fdw_package: FeatureGate,
}

impl FeatureGates {
    pub fn evaluate(facts: &PlatformFacts) -> Self {
        Self {
            fdw_build: FeatureGate::evaluate(GateId::FdwBuild, facts.major_version),
            fdw_package: FeatureGate::evaluate(GateId::FdwPackage, facts.major_version),
        }
    }

    pub fn get(&self, id: GateId) -> &FeatureGate {
        match id {
            GateId::FdwBuild => &self.fdw_build,
            GateId::FdwPackage => &self.fdw_package,
        }
    }

    /// Skip reason for an optional gate reference, if it is inactive.
    pub fn skip_reason(&self, gate: Option<GateId>) -> Option<&str> {
        gate.and_then(|id| self.get(id).skip_reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gates_for(major: u32) -> FeatureGates {
        FeatureGates::evaluate(&PlatformFacts::new(major, "x86_64", "1.2.3"))
    }

    #[test]
    fn test_both_gates_active_from_seven() {
        for major in [7, 8, 12] {
            let gates = gates_for(major);
            assert!(gates.fdw_build.is_active(), "major {}", major);
            assert!(gates.fdw_package.is_active(), "major {}", major);
        }
    }

    #[test]
    fn test_six_builds_but_does_not_package() {
        let gates = gates_for(6);
        assert!(gates.fdw_build.is_active());
        assert!(!gates.fdw_package.is_active());
        assert_eq!(
            gates.fdw_package.skip_reason.as_deref(),
            Some("platform version 6 is less than 7.")
        );
    }

    #[test]
    fn test_below_six_both_inactive() {
        let gates = gates_for(5);
        assert_eq!(
            gates.fdw_build.skip_reason.as_deref(),
            Some("platform version 5 is less than 6.")
        );
        assert_eq!(
            gates.fdw_package.skip_reason.as_deref(),
            Some("platform version 5 is less than 7.")
        );
    }

    #[test]
    fn test_check_returns_gate_skipped() {
        let gates = gates_for(6);
        assert!(gates.fdw_build.check().is_ok());
        match gates.fdw_package.check() {
            Err(Error::GateSkipped { gate, reason }) => {
                assert_eq!(gate, "fdw-package");
                assert_eq!(reason, "platform version 6 is less than 7.");
            }
            other => panic!("expected GateSkipped, got {:?}", other),
        }
    }

    #[test]
    fn test_ungated_reference_always_allowed() {
        let gates = gates_for(5);
        assert!(gates.skip_reason(Some(GateId::FdwBuild)).is_some());
        assert!(gates.skip_reason(None).is_none());
    }
}

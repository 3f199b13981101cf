//! Per-driver update decision and its table row

use std::fmt;

use crate::version::eligibility::Eligibility;
use crate::version::version_string::VersionString;

/// Outcome of comparing a driver's installed and latest versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Driver does not apply to this host
    NotApplicable,
    /// Installed version is the latest (or newer)
    UpToDate,
    /// A newer version is available
    UpdateRequired,
}

/// Decide whether a driver needs an update.
///
/// Ineligible drivers are never updated, whatever the versions say.
pub fn plan(eligibility: Eligibility, remote: &VersionString, local: &VersionString) -> Decision {
    if !eligibility.is_eligible() {
        return Decision::NotApplicable;
    }

    if local < remote {
        Decision::UpdateRequired
    } else {
        Decision::UpToDate
    }
}

/// Last column of the comparison table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateFlag {
    Yes,
    No,
    NotSupported { host_class: String },
    Failed { reason: String },
}

impl UpdateFlag {
    pub fn from_decision(decision: Decision, host_class: &str) -> Self {
        match decision {
            Decision::UpdateRequired => UpdateFlag::Yes,
            Decision::UpToDate => UpdateFlag::No,
            Decision::NotApplicable => UpdateFlag::NotSupported {
                host_class: host_class.to_string(),
            },
        }
    }
}

impl fmt::Display for UpdateFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateFlag::Yes => f.write_str("yes"),
            UpdateFlag::No => f.write_str("no"),
            UpdateFlag::NotSupported { host_class } => {
                write!(f, "not supported on {} instance type", host_class)
            }
            UpdateFlag::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// One line of the comparison table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub id: String,
    pub installed: String,
    pub latest: String,
    pub flag: UpdateFlag,
}

impl DisplayRow {
    pub const NONE: &'static str = "none";

    pub fn new(
        id: &str,
        installed: Option<&str>,
        latest: Option<&VersionString>,
        flag: UpdateFlag,
    ) -> Self {
        // Ineligible drivers show no versions even if they were discovered
        let (installed, latest) = match flag {
            UpdateFlag::NotSupported { .. } => (None, None),
            _ => (installed, latest),
        };

        Self {
            id: id.to_string(),
            installed: installed.unwrap_or(Self::NONE).to_string(),
            latest: latest
                .map(|v| v.to_string())
                .unwrap_or_else(|| Self::NONE.to_string()),
            flag,
        }
    }
}

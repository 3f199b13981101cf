//! Per-run scratch data for one driver

use std::path::PathBuf;

use crate::update::error::DriverError;
use crate::version::local::InstalledVersion;
use crate::version::planner::Decision;
use crate::version::version_string::VersionString;

/// Tri-state update flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NeedsUpdate {
    #[default]
    Undetermined,
    No,
    Yes,
}

impl From<Decision> for NeedsUpdate {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::UpdateRequired => NeedsUpdate::Yes,
            Decision::UpToDate | Decision::NotApplicable => NeedsUpdate::No,
        }
    }
}

/// Position in the fetch → extract → install pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Queued,
    Downloading,
    Extracting,
    Installing,
    Done,
    Failed,
}

/// Mutable state of one driver slot.
///
/// Each slot is written only by the task handling that driver during a
/// phase; the orchestrator reads it after the phase's join.
#[derive(Debug, Default)]
pub struct DriverState {
    pub latest: Option<VersionString>,
    pub installed: Option<InstalledVersion>,
    /// Planner outcome; absent until phase 2 decides or when a check failed
    pub decision: Option<Decision>,
    pub needs_update: NeedsUpdate,
    pub stage: Stage,
    pub download_path: Option<PathBuf>,
    pub error: Option<DriverError>,
}

impl DriverState {
    /// Record a failure and stop this driver's pipeline
    pub fn fail(&mut self, error: impl Into<DriverError>) {
        self.error = Some(error.into());
        self.stage = Stage::Failed;
    }

    /// Store the planner's outcome and the update flag derived from it
    pub fn decide(&mut self, decision: Decision) {
        self.decision = Some(decision);
        self.needs_update = decision.into();
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Needs an update and nothing has failed so far
    pub fn is_pending_update(&self) -> bool {
        self.needs_update == NeedsUpdate::Yes && !self.is_failed()
    }
}

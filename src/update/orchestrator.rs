//! Phase-by-phase driver update run
//!
//! ```text
//! remote check ─▶ local check + plan ─▶ gate ─▶ download ─▶ extract ─▶ install ─▶ cleanup
//!  (parallel)        (parallel)                (parallel)  (parallel)  (serial)   (serial)
//! ```
//!
//! Every phase joins all of its tasks before the next one starts. Within a
//! phase each task owns exactly one `DriverState` slot, so no locking is
//! needed and results are visible to the next phase once the join returns.
//! A driver whose step fails is marked failed and skipped by later phases;
//! other drivers carry on.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::archive::is_archive;
use crate::config::UpdaterConfig;
use crate::driver::types::{DriverSpec, HostClass};
use crate::fetch::Fetcher;
use crate::shell::CommandRunner;
use crate::update::executor::UpdateExecutor;
use crate::update::report::render_table;
use crate::update::state::{DriverState, NeedsUpdate, Stage};
use crate::version::eligibility::{self, Eligibility};
use crate::version::local::LocalVersionResolver;
use crate::version::planner::{Decision, DisplayRow, UpdateFlag, plan};
use crate::version::remote::RemoteVersionResolver;

/// Where the run stopped after planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// No eligible driver needs an update
    UpToDate,
    /// Updates are available but installation was not authorized
    NotAuthorized,
    /// Download, extract, install and cleanup phases ran
    Proceeded,
}

/// A driver that did not make it through its pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverFailure {
    pub id: String,
    pub message: String,
}

/// Outcome of one orchestrator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Comparison table rows in driver-table order
    pub rows: Vec<DisplayRow>,
    pub any_update_needed: bool,
    pub gate: Gate,
    /// Ids of drivers whose installer completed
    pub installed: Vec<String>,
    pub failures: Vec<DriverFailure>,
    /// Cleanup problems; reported but never a failure
    pub cleanup_warnings: Vec<DriverFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 0 when nothing failed, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Drives every driver through the update pipeline
pub struct Orchestrator {
    remote: RemoteVersionResolver,
    local: LocalVersionResolver,
    executor: UpdateExecutor,
}

impl Orchestrator {
    pub fn new(
        remote: RemoteVersionResolver,
        local: LocalVersionResolver,
        executor: UpdateExecutor,
    ) -> Self {
        Self {
            remote,
            local,
            executor,
        }
    }

    /// Wire the default resolvers and executor from configuration
    pub fn from_config(
        config: &UpdaterConfig,
        fetcher: Arc<dyn Fetcher>,
        runner: Arc<dyn CommandRunner>,
        work_dir: PathBuf,
    ) -> Self {
        Self::new(
            RemoteVersionResolver::new(fetcher.clone()),
            LocalVersionResolver::new(
                runner.clone(),
                config.probe_shell.clone(),
                config.timeouts.probe(),
            ),
            UpdateExecutor::new(
                fetcher,
                runner,
                work_dir,
                config.timeouts.download(),
                config.timeouts.install(),
            ),
        )
    }

    /// Check every driver and, if authorized, install the ones that are behind.
    ///
    /// Progress and the comparison table go to `out`. Driver failures never
    /// abort the run; they are collected in the returned report. Only errors
    /// writing to `out` are returned as `Err`.
    pub async fn run<W: Write + Send>(
        &self,
        drivers: &[DriverSpec],
        host: &HostClass,
        install_authorized: bool,
        out: &mut W,
    ) -> io::Result<RunReport> {
        let mut states: Vec<DriverState> = drivers.iter().map(|_| DriverState::default()).collect();

        write!(out, "Checking for latest driver versions.. ")?;
        out.flush()?;
        self.check_remote(drivers, &mut states).await;
        writeln!(out, "Done.")?;

        write!(out, "Checking installed driver versions.. ")?;
        out.flush()?;
        self.check_local(drivers, &mut states, host).await;
        writeln!(out, "Done.")?;

        let rows = build_rows(drivers, &states, host);
        write!(out, "{}", render_table(&rows))?;

        let any_update_needed = states.iter().any(|s| s.needs_update == NeedsUpdate::Yes);
        if !any_update_needed {
            if states.iter().any(DriverState::is_failed) {
                writeln!(out, "No driver updates are needed.")?;
            } else {
                writeln!(out, "Driver versions are up to date.")?;
            }
            return Ok(build_report(drivers, &states, rows, false, Gate::UpToDate, vec![]));
        }
        if !install_authorized {
            writeln!(out, "Driver updates are needed but --install was not passed.")?;
            return Ok(build_report(drivers, &states, rows, true, Gate::NotAuthorized, vec![]));
        }
        writeln!(out, "Driver updates are needed. Beginning installation.")?;

        let selected = pending_mask(&states);

        self.download_all(drivers, &mut states, out).await?;
        self.extract_all(drivers, &mut states, out).await?;
        self.install_all(drivers, &mut states, out).await?;
        let cleanup_warnings = self.cleanup_all(drivers, &selected, out).await?;

        Ok(build_report(
            drivers,
            &states,
            rows,
            true,
            Gate::Proceeded,
            cleanup_warnings,
        ))
    }

    /// Phase 1: latest version of every driver
    async fn check_remote(&self, drivers: &[DriverSpec], states: &mut [DriverState]) {
        let tasks = drivers.iter().zip(states.iter_mut()).map(|(spec, state)| async move {
            match self
                .remote
                .fetch_latest(&spec.version_url, &spec.version_pattern)
                .await
            {
                Ok(latest) => state.latest = Some(latest),
                Err(e) => {
                    warn!("Latest version check for {} failed: {}", spec.id, e);
                    state.fail(e);
                }
            }
        });

        join_all(tasks).await;
    }

    /// Phase 2: eligibility, installed version and decision
    async fn check_local(&self, drivers: &[DriverSpec], states: &mut [DriverState], host: &HostClass) {
        let tasks = drivers.iter().zip(states.iter_mut()).map(|(spec, state)| async move {
            let eligibility = eligibility::evaluate(&spec.eligibility, host);

            if eligibility == Eligibility::Ineligible {
                if let Some(e) = state.error.take() {
                    debug!("Ignoring remote failure for unsupported {}: {}", spec.id, e);
                    state.stage = Stage::Queued;
                }
                state.decide(Decision::NotApplicable);
                info!("{} is not supported on {}", spec.id, host);
                return;
            }

            let Some(latest) = state.latest.clone() else {
                return;
            };

            match self.local.fetch_installed(&spec.probe_command).await {
                Ok(installed) => {
                    let decision = plan(eligibility, &latest, &installed.version);
                    debug!(
                        "{}: installed {} latest {} -> {:?}",
                        spec.id, installed.version, latest, decision
                    );
                    state.decide(decision);
                    state.installed = Some(installed);
                }
                Err(e) => {
                    warn!("Installed version check for {} failed: {}", spec.id, e);
                    state.fail(e);
                }
            }
        });

        join_all(tasks).await;
    }

    /// Phase 3: concurrent downloads
    async fn download_all<W: Write>(
        &self,
        drivers: &[DriverSpec],
        states: &mut [DriverState],
        out: &mut W,
    ) -> io::Result<()> {
        for (spec, _) in pending(drivers, states) {
            writeln!(
                out,
                "Downloading latest {} driver to {}",
                spec.id,
                spec.artifact_name().unwrap_or_default()
            )?;
        }

        let before = pending_mask(states);
        let tasks = drivers
            .iter()
            .zip(states.iter_mut())
            .filter(|(_, state)| state.is_pending_update())
            .map(|(spec, state)| self.executor.run_download(spec, state));
        join_all(tasks).await;

        report_new_failures(out, drivers, states, &before, "Download")
    }

    /// Phase 4: concurrent extraction
    async fn extract_all<W: Write>(
        &self,
        drivers: &[DriverSpec],
        states: &mut [DriverState],
        out: &mut W,
    ) -> io::Result<()> {
        for (spec, state) in pending(drivers, states) {
            if state.download_path.as_deref().is_some_and(is_archive) {
                writeln!(out, "Extracting {}", spec.artifact_name().unwrap_or_default())?;
            }
        }

        let before = pending_mask(states);
        let tasks = drivers
            .iter()
            .zip(states.iter_mut())
            .filter(|(_, state)| state.is_pending_update())
            .map(|(spec, state)| self.executor.run_extract(spec, state));
        join_all(tasks).await;

        report_new_failures(out, drivers, states, &before, "Extraction")
    }

    /// Phase 5: one installer at a time, in driver-table order
    async fn install_all<W: Write>(
        &self,
        drivers: &[DriverSpec],
        states: &mut [DriverState],
        out: &mut W,
    ) -> io::Result<()> {
        for (spec, state) in drivers.iter().zip(states.iter_mut()) {
            if !state.is_pending_update() {
                continue;
            }

            let latest = state
                .latest
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_default();
            write!(out, "Installing {} version {} driver.. ", spec.id, latest)?;
            out.flush()?;

            self.executor.run_install(spec, state).await;

            match &state.error {
                None => writeln!(out, "Done.")?,
                Some(e) => writeln!(out, "Failed: {}", e)?,
            }
        }
        Ok(())
    }

    /// Phase 6: remove work files of every driver that entered phase 3
    async fn cleanup_all<W: Write>(
        &self,
        drivers: &[DriverSpec],
        selected: &[bool],
        out: &mut W,
    ) -> io::Result<Vec<DriverFailure>> {
        write!(out, "Cleaning up.. ")?;
        out.flush()?;

        let mut warnings = Vec::new();
        for (spec, _) in drivers.iter().zip(selected).filter(|(_, selected)| **selected) {
            if let Err(e) = self.executor.cleanup(spec).await {
                warnings.push(DriverFailure {
                    id: spec.id.clone(),
                    message: e.to_string(),
                });
            }
        }

        if warnings.is_empty() {
            writeln!(out, "Done.")?;
        } else {
            writeln!(out, "Done with {} warning(s).", warnings.len())?;
        }
        Ok(warnings)
    }
}

fn pending<'a>(
    drivers: &'a [DriverSpec],
    states: &'a [DriverState],
) -> impl Iterator<Item = (&'a DriverSpec, &'a DriverState)> {
    drivers
        .iter()
        .zip(states.iter())
        .filter(|(_, state)| state.is_pending_update())
}

fn pending_mask(states: &[DriverState]) -> Vec<bool> {
    states.iter().map(DriverState::is_pending_update).collect()
}

/// Print a line for every driver that was pending before a phase and failed in it
fn report_new_failures<W: Write>(
    out: &mut W,
    drivers: &[DriverSpec],
    states: &[DriverState],
    before: &[bool],
    label: &str,
) -> io::Result<()> {
    for ((spec, state), was_pending) in drivers.iter().zip(states).zip(before) {
        if !*was_pending {
            continue;
        }
        if let Some(e) = &state.error {
            writeln!(out, "{} of {} failed: {}", label, spec.id, e)?;
        }
    }
    Ok(())
}

fn build_rows(drivers: &[DriverSpec], states: &[DriverState], host: &HostClass) -> Vec<DisplayRow> {
    drivers
        .iter()
        .zip(states)
        .map(|(spec, state)| {
            let flag = match (&state.error, state.decision) {
                (Some(e), _) => UpdateFlag::Failed {
                    reason: e.to_string(),
                },
                (None, Some(decision)) => UpdateFlag::from_decision(decision, host.as_str()),
                // Every undecided driver has an error recorded
                (None, None) => UpdateFlag::No,
            };

            DisplayRow::new(
                &spec.id,
                state.installed.as_ref().map(|i| i.display.as_str()),
                state.latest.as_ref(),
                flag,
            )
        })
        .collect()
}

fn build_report(
    drivers: &[DriverSpec],
    states: &[DriverState],
    rows: Vec<DisplayRow>,
    any_update_needed: bool,
    gate: Gate,
    cleanup_warnings: Vec<DriverFailure>,
) -> RunReport {
    let pairs = || drivers.iter().zip(states);

    RunReport {
        rows,
        any_update_needed,
        gate,
        installed: pairs()
            .filter(|(_, state)| state.stage == Stage::Done)
            .map(|(spec, _)| spec.id.clone())
            .collect(),
        failures: pairs()
            .filter_map(|(spec, state)| {
                state.error.as_ref().map(|e| DriverFailure {
                    id: spec.id.clone(),
                    message: e.to_string(),
                })
            })
            .collect(),
        cleanup_warnings,
    }
}

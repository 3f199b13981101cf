//! Installed version discovery through a host-shell probe

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::shell::{CommandRunner, CommandSpec, ShellError};
use crate::version::error::LocalError;
use crate::version::version_string::VersionString;

/// Number of components shown for installed versions
pub const DISPLAY_COMPONENTS: usize = 3;

/// Version reported by a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    /// Full reported version, used for comparison
    pub version: VersionString,
    /// Truncated form for display
    pub display: String,
}

impl InstalledVersion {
    pub fn new(version: VersionString) -> Self {
        let display = version.canonicalize(DISPLAY_COMPONENTS);
        Self { version, display }
    }
}

/// Runs driver probe commands through a host shell
pub struct LocalVersionResolver {
    runner: Arc<dyn CommandRunner>,
    /// Shell program followed by its leading arguments; the probe is appended
    shell: Vec<String>,
    timeout: Duration,
}

impl LocalVersionResolver {
    pub fn new(runner: Arc<dyn CommandRunner>, shell: Vec<String>, timeout: Duration) -> Self {
        Self {
            runner,
            shell,
            timeout,
        }
    }

    /// Run `probe` and parse its trimmed output as a version.
    ///
    /// A non-zero exit status is logged but the output is still used; some
    /// probes print a usable version and then fail on cleanup.
    pub async fn fetch_installed(&self, probe: &str) -> Result<InstalledVersion, LocalError> {
        let command = self.probe_command(probe)?;
        let output = self.runner.run(&command).await?;

        if !output.success() {
            warn!(
                "Version probe exited with {:?}: {}",
                output.exit_code,
                output.combined.trim()
            );
        }

        let text = output.combined.trim();
        if text.is_empty() {
            return Err(LocalError::EmptyOutput);
        }

        let version = VersionString::parse(text)?;
        debug!("Probe reported installed version {}", version);
        Ok(InstalledVersion::new(version))
    }

    fn probe_command(&self, probe: &str) -> Result<CommandSpec, LocalError> {
        let (program, leading) = self
            .shell
            .split_first()
            .ok_or(ShellError::EmptyCommand)?;

        let mut args = leading.to_vec();
        args.push(probe.to_string());
        Ok(CommandSpec::new(program.clone(), args).timeout(self.timeout))
    }
}

//! In-memory stand-ins for the network and the host shell

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use ec2_driver_updater::fetch::{FetchError, Fetcher};
use ec2_driver_updater::shell::{CommandOutput, CommandRunner, CommandSpec, ShellError};

/// Program name the fake runner treats as the probe shell
pub const PROBE_SHELL: &str = "probe-shell";

/// Serves fixed bodies by URL; unknown URLs answer 404
#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    /// URLs requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requests().iter().any(|u| u == url)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Answers probes from a table and records every command it is asked to run.
///
/// Commands run through [`PROBE_SHELL`] are probes keyed by their last
/// argument; unknown probes print nothing. Anything else is an installer,
/// which exits 0 unless its program was registered as failing.
#[derive(Default)]
pub struct FakeRunner {
    probes: HashMap<String, String>,
    failing_installers: HashMap<String, i32>,
    calls: Mutex<Vec<CommandSpec>>,
    /// Entry names of the working directory at the time each installer ran
    install_dirs: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(mut self, probe: &str, output: &str) -> Self {
        self.probes.insert(probe.to_string(), output.to_string());
        self
    }

    pub fn with_failing_installer(mut self, program: &str, exit_code: i32) -> Self {
        self.failing_installers
            .insert(program.to_string(), exit_code);
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Installer invocations, excluding probes
    pub fn installs(&self) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.program != PROBE_SHELL)
            .collect()
    }

    /// Sorted working directory listings, one per installer run
    pub fn install_dirs(&self) -> Vec<Vec<String>> {
        self.install_dirs.lock().unwrap().clone()
    }

    /// Probe texts that were run
    pub fn probes_run(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == PROBE_SHELL)
            .filter_map(|c| c.args.last().cloned())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ShellError> {
        self.calls.lock().unwrap().push(command.clone());

        if command.program == PROBE_SHELL {
            let probe = command.args.last().cloned().unwrap_or_default();
            return Ok(match self.probes.get(&probe) {
                Some(output) => CommandOutput {
                    exit_code: Some(0),
                    combined: output.clone(),
                },
                None => CommandOutput {
                    exit_code: Some(1),
                    combined: String::new(),
                },
            });
        }

        let mut listing: Vec<String> = command
            .cwd
            .as_ref()
            .and_then(|dir| std::fs::read_dir(dir).ok())
            .into_iter()
            .flatten()
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        listing.sort();
        self.install_dirs.lock().unwrap().push(listing);

        let exit_code = self
            .failing_installers
            .get(&command.program)
            .copied()
            .unwrap_or(0);
        Ok(CommandOutput {
            exit_code: Some(exit_code),
            combined: format!("{} finished", command.program),
        })
    }
}

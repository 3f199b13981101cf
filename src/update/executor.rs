//! Download, extract, install and clean up a single driver

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::archive::{extract_zip, extraction_dir, is_archive};
use crate::driver::types::DriverSpec;
use crate::fetch::Fetcher;
use crate::shell::{CommandOutput, CommandRunner, CommandSpec};
use crate::update::error::{CleanupError, DownloadError, ExtractError, InstallError};
use crate::update::state::{DriverState, Stage};

/// Runs the update steps for one driver at a time.
///
/// Every driver writes to `<work_dir>/<artifact>` and, for archives,
/// `<work_dir>/<artifact stem>`. Config validation rejects tables where two
/// drivers would share one of these names, so concurrent steps for
/// different drivers never touch the same paths.
pub struct UpdateExecutor {
    fetcher: Arc<dyn Fetcher>,
    runner: Arc<dyn CommandRunner>,
    work_dir: PathBuf,
    download_timeout: Duration,
    install_timeout: Duration,
}

impl UpdateExecutor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        runner: Arc<dyn CommandRunner>,
        work_dir: PathBuf,
        download_timeout: Duration,
        install_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            runner,
            work_dir,
            download_timeout,
            install_timeout,
        }
    }

    /// Local path of the downloaded bundle
    pub fn artifact_path(&self, spec: &DriverSpec) -> Option<PathBuf> {
        spec.artifact_name().map(|name| self.work_dir.join(name))
    }

    /// Fetch the driver bundle into the work directory
    pub async fn download(&self, spec: &DriverSpec) -> Result<PathBuf, DownloadError> {
        let path = self
            .artifact_path(spec)
            .ok_or_else(|| DownloadError::InvalidUrl(spec.download_url.clone()))?;

        let bytes = self
            .fetcher
            .get(&spec.download_url, self.download_timeout)
            .await?;

        let write_err = |source| DownloadError::Write {
            path: path.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(write_err)?;
        tokio::fs::write(&path, &bytes).await.map_err(write_err)?;

        info!(
            "Downloaded {} ({} bytes) to {}",
            spec.id,
            bytes.len(),
            path.display()
        );
        Ok(path)
    }

    /// Expand an archive next to itself and delete it.
    ///
    /// Returns the extraction directory, or `None` when the download is not
    /// an archive and there is nothing to extract.
    pub async fn extract(&self, artifact: &Path) -> Result<Option<PathBuf>, ExtractError> {
        if !is_archive(artifact) {
            debug!("{} is not an archive, skipping extraction", artifact.display());
            return Ok(None);
        }

        let dest = extraction_dir(artifact);
        let (archive, target) = (artifact.to_path_buf(), dest.clone());
        tokio::task::spawn_blocking(move || extract_zip(&archive, &target)).await??;

        tokio::fs::remove_file(artifact)
            .await
            .map_err(|source| ExtractError::RemoveArchive {
                path: artifact.to_path_buf(),
                source,
            })?;

        Ok(Some(dest))
    }

    /// Run the driver's install command from the work directory
    pub async fn install(&self, spec: &DriverSpec) -> Result<CommandOutput, InstallError> {
        let command = CommandSpec::from_command_line(&spec.install_command)?
            .current_dir(&self.work_dir)
            .timeout(self.install_timeout);

        let output = self.runner.run(&command).await?;
        debug!("Installer output for {}: {}", spec.id, output.combined.trim());

        if !output.success() {
            return Err(InstallError::Failed {
                exit_code: output.exit_code,
                output: output.combined.trim().to_string(),
            });
        }

        Ok(output)
    }

    /// Remove whatever the earlier steps left in the work directory.
    ///
    /// Paths that do not exist are not an error.
    pub async fn cleanup(&self, spec: &DriverSpec) -> Result<(), CleanupError> {
        let Some(artifact) = self.artifact_path(spec) else {
            return Ok(());
        };

        if is_archive(&artifact) {
            remove_path(&extraction_dir(&artifact), true).await?;
        }
        remove_path(&artifact, false).await
    }

    // -------------------------------------------------------------------------
    // State machine wrappers used by the orchestrator
    // -------------------------------------------------------------------------

    /// queued → downloading
    pub async fn run_download(&self, spec: &DriverSpec, state: &mut DriverState) {
        state.stage = Stage::Downloading;
        match self.download(spec).await {
            Ok(path) => state.download_path = Some(path),
            Err(e) => {
                error!("Download of {} failed: {}", spec.id, e);
                state.fail(e);
            }
        }
    }

    /// downloading → extracting
    pub async fn run_extract(&self, spec: &DriverSpec, state: &mut DriverState) {
        let Some(artifact) = state.download_path.clone() else {
            return;
        };

        state.stage = Stage::Extracting;
        match self.extract(&artifact).await {
            Ok(Some(dir)) => debug!("Extracted {} into {}", spec.id, dir.display()),
            Ok(None) => {}
            Err(e) => {
                error!("Extraction of {} failed: {}", spec.id, e);
                state.fail(e);
            }
        }
    }

    /// extracting → installing → done
    pub async fn run_install(&self, spec: &DriverSpec, state: &mut DriverState) {
        state.stage = Stage::Installing;
        match self.install(spec).await {
            Ok(_) => {
                info!("Installed {}", spec.id);
                state.stage = Stage::Done;
            }
            Err(e) => {
                error!("Install of {} failed: {}", spec.id, e);
                state.fail(e);
            }
        }
    }
}

async fn remove_path(path: &Path, is_dir: bool) -> Result<(), CleanupError> {
    let result = if is_dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => {
            warn!("Failed to remove {}: {}", path.display(), source);
            Err(CleanupError {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

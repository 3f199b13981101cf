use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::fetch::FetchError;
use crate::shell::ShellError;
use crate::version::error::{LocalError, RemoteError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download URL {0} does not name a file")]
    InvalidUrl(String),

    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Extraction failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Failed to remove {}: {source}", path.display())]
    RemoveArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Installer could not run: {0}")]
    Command(#[from] ShellError),

    #[error("Installer exited with {exit_code:?}: {output}")]
    Failed {
        exit_code: Option<i32>,
        output: String,
    },
}

#[derive(Debug, Error)]
#[error("Failed to remove {}: {source}", path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Why a driver's pipeline stopped early
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Local(#[from] LocalError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Install(#[from] InstallError),
}

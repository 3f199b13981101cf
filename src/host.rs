//! Host identification and privilege checks

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::METADATA_TIMEOUT;
use crate::driver::types::HostClass;
use crate::fetch::{FetchError, Fetcher};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Instance metadata unavailable: {0}")]
    MetadataUnavailable(#[from] FetchError),

    #[error("Instance metadata returned an empty instance type")]
    EmptyInstanceType,
}

/// Ask the instance metadata service for this host's instance type.
///
/// Any response body counts; a host that answers on the metadata address
/// without being EC2 is not detected.
pub async fn detect_instance_type(
    fetcher: &dyn Fetcher,
    metadata_url: &str,
) -> Result<HostClass, HostError> {
    let body = fetcher
        .get(metadata_url, METADATA_TIMEOUT)
        .await
        .inspect_err(|e| warn!("Instance type lookup failed: {}", e))?;

    let text = String::from_utf8_lossy(&body);
    if text.trim().is_empty() {
        return Err(HostError::EmptyInstanceType);
    }

    let host = HostClass::new(&text);
    debug!("Detected instance type {}", host);
    Ok(host)
}

/// Whether the current OS is one the built-in drivers target
pub fn is_supported_os() -> bool {
    cfg!(windows)
}

/// Whether the process runs with administrator rights
#[cfg(windows)]
pub fn is_elevated() -> bool {
    // Raw disk access is only granted to elevated processes
    std::fs::File::open(r"\\.\PHYSICALDRIVE0").is_ok()
}

#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    false
}

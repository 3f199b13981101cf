//! Latest released version discovery from a reference page

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use crate::config::REMOTE_FETCH_TIMEOUT;
use crate::fetch::Fetcher;
use crate::version::error::RemoteError;
use crate::version::version_string::VersionString;

/// Scrapes version strings out of a page and picks the newest one
pub struct RemoteVersionResolver {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
}

impl RemoteVersionResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            timeout: REMOTE_FETCH_TIMEOUT,
        }
    }

    /// Fetch `url` and return the highest version matching `pattern`.
    ///
    /// # Returns
    /// * `Ok(VersionString)` - Numerically greatest distinct match
    /// * `Err(RemoteError::Unavailable)` - Transport error, timeout or non-2xx status
    /// * `Err(RemoteError::NoMatch)` - No match parses as a version
    /// * `Err(RemoteError::InvalidPattern)` - `pattern` is not a valid regex
    pub async fn fetch_latest(
        &self,
        url: &str,
        pattern: &str,
    ) -> Result<VersionString, RemoteError> {
        let regex = Regex::new(pattern).map_err(|source| RemoteError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let body = self.fetcher.get(url, self.timeout).await?;
        let content = String::from_utf8_lossy(&body);

        let latest = latest_in(&content, &regex).ok_or_else(|| RemoteError::NoMatch {
            url: url.to_string(),
            pattern: pattern.to_string(),
        })?;

        info!("Latest version at {} is {}", url, latest);
        Ok(latest)
    }
}

/// Highest version among all non-overlapping matches of `regex` in `content`.
///
/// Matches are deduplicated as strings, then compared as versions so that
/// "10.0.0" outranks "9.0.0". Matches that are not dotted numbers are skipped.
pub fn latest_in(content: &str, regex: &Regex) -> Option<VersionString> {
    let unique: BTreeSet<&str> = regex.find_iter(content).map(|m| m.as_str()).collect();
    debug!("Found {} distinct version candidates", unique.len());

    unique
        .into_iter()
        .filter_map(|candidate| {
            VersionString::parse(candidate)
                .inspect_err(|e| debug!("Skipping candidate {:?}: {}", candidate, e))
                .ok()
        })
        .max()
}

use thiserror::Error;

use crate::fetch::FetchError;
use crate::shell::ShellError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("Empty version string")]
    Empty,

    #[error("Invalid version {input:?}: component {component:?} is not a non-negative integer")]
    InvalidComponent { input: String, component: String },
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Version page unavailable: {0}")]
    Unavailable(#[from] FetchError),

    #[error("No version matching {pattern:?} found at {url}")]
    NoMatch { url: String, pattern: String },

    #[error("Invalid version pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("Version probe failed: {0}")]
    ProbeUnavailable(#[from] ShellError),

    #[error("Version probe returned no output")]
    EmptyOutput,

    #[error("Version probe returned an unusable version: {0}")]
    InvalidVersion(#[from] VersionParseError),
}

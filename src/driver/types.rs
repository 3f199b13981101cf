//! Common types describing updatable drivers and the host they run on

use std::fmt;

use serde::Deserialize;

/// Static description of one updatable driver
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriverSpec {
    /// Short identifier, unique within a driver table (e.g., "nvme")
    pub id: String,
    /// Human-readable name (e.g., "AWS NVMe driver")
    pub name: String,
    /// Bundle to download when an update is required
    pub download_url: String,
    /// Host-shell snippet printing the installed version
    pub probe_command: String,
    /// Installer command line, run from the work directory
    pub install_command: String,
    /// Page listing released versions
    pub version_url: String,
    /// Regular expression matching version strings on `version_url`
    pub version_pattern: String,
    /// Host classes the driver applies to
    #[serde(default)]
    pub eligibility: EligibilityRule,
}

impl DriverSpec {
    /// File name the download is stored under: the URL's final path segment
    pub fn artifact_name(&self) -> Option<String> {
        artifact_name(&self.download_url)
    }
}

/// Final non-empty path segment of `url`
///
/// Examples:
/// - "https://host/NVMe/Latest/AWSNVMe.zip" -> Some("AWSNVMe.zip")
/// - "https://host/" -> None
pub fn artifact_name(url: &str) -> Option<String> {
    let url = reqwest::Url::parse(url).ok()?;
    url.path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Host class lists used by an eligibility rule
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HostRules {
    /// Exact host classes (e.g., "m4.large")
    pub classes: Vec<String>,
    /// Host class families, matched against the text before the first '.'
    /// (e.g., "c5" matches "c5.xlarge")
    pub prefixes: Vec<String>,
}

impl HostRules {
    pub fn new(classes: &[&str], prefixes: &[&str]) -> Self {
        Self {
            classes: classes.iter().map(|c| c.to_lowercase()).collect(),
            prefixes: prefixes.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn matches(&self, host: &HostClass) -> bool {
        self.classes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(host.as_str()))
            || self
                .prefixes
                .iter()
                .any(|p| p.eq_ignore_ascii_case(host.prefix()))
    }
}

/// Applicability policy of a driver; exactly one kind per driver
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum EligibilityRule {
    /// Listed hosts are unsupported, everything else is eligible
    Deny(HostRules),
    /// Only listed hosts are supported
    Allow(HostRules),
}

impl Default for EligibilityRule {
    fn default() -> Self {
        EligibilityRule::Deny(HostRules::default())
    }
}

/// Opaque host classification (an EC2 instance type such as "m5.xlarge")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostClass(String);

impl HostClass {
    /// Normalizes to trimmed lowercase
    pub fn new(class: &str) -> Self {
        Self(class.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Family part of the class: "m5" for "m5.xlarge"
    pub fn prefix(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::archive::{extraction_dir, is_archive};
use crate::driver::catalog::default_drivers;
use crate::driver::types::DriverSpec;

// =============================================================================
// Time-related constants
// =============================================================================

/// Upper bound for fetching a version reference page (5 seconds)
pub const REMOTE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the instance metadata request (2 seconds)
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Default timeout for a version probe command in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 60;

/// Default timeout for downloading a driver bundle in seconds (10 minutes)
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 10 * 60;

/// Default timeout for a driver installer in seconds (30 minutes)
pub const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 30 * 60;

/// EC2 instance metadata endpoint returning the instance type
pub const DEFAULT_METADATA_URL: &str = "http://169.254.169.254/latest/meta-data/instance-type";

const APP_DIR_NAME: &str = "ec2-driver-updater";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Updater configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdaterConfig {
    /// Drivers to check, in display and install order
    pub drivers: Vec<DriverSpec>,
    /// Shell program and leading arguments used to run probe commands
    pub probe_shell: Vec<String>,
    pub timeouts: TimeoutConfig,
    /// URL returning the host's instance type
    pub metadata_url: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            drivers: default_drivers(),
            probe_shell: vec![
                "powershell.exe".to_string(),
                "-NoProfile".to_string(),
                "-Command".to_string(),
            ],
            timeouts: TimeoutConfig::default(),
            metadata_url: DEFAULT_METADATA_URL.to_string(),
        }
    }
}

/// Command and download timeouts
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeoutConfig {
    pub probe_secs: u64,
    pub download_secs: u64,
    pub install_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            download_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            install_secs: DEFAULT_INSTALL_TIMEOUT_SECS,
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    pub fn install(&self) -> Duration {
        Duration::from_secs(self.install_secs)
    }
}

impl UpdaterConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration to use.
    ///
    /// An explicit path wins, then the user config file if it exists,
    /// then the built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            info!("Loading configuration from {}", path.display());
            return Self::load(path);
        }

        let path = config_path();
        if path.is_file() {
            info!("Loading configuration from {}", path.display());
            return Self::load(&path);
        }

        debug!("No config file at {}, using defaults", path.display());
        Ok(Self::default())
    }

    /// Reject tables the orchestrator cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drivers.is_empty() {
            return Err(ConfigError::Invalid("no drivers configured".to_string()));
        }
        if self.probe_shell.is_empty() {
            return Err(ConfigError::Invalid("probeShell must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        let mut work_paths: HashMap<String, &str> = HashMap::new();
        for driver in &self.drivers {
            if !seen.insert(driver.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate driver id {:?}",
                    driver.id
                )));
            }
            if let Err(e) = regex::Regex::new(&driver.version_pattern) {
                return Err(ConfigError::Invalid(format!(
                    "driver {:?} has an invalid versionPattern: {}",
                    driver.id, e
                )));
            }
            let Some(artifact) = driver.artifact_name() else {
                return Err(ConfigError::Invalid(format!(
                    "driver {:?} has a downloadUrl without a file name",
                    driver.id
                )));
            };
            // Downloads and extractions run concurrently in one work directory,
            // which is case-insensitive on Windows
            for entry in work_entries(&artifact) {
                if let Some(owner) = work_paths.insert(entry.clone(), driver.id.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "drivers {:?} and {:?} both use {:?} in the work directory",
                        owner, driver.id, entry
                    )));
                }
            }
            if driver.install_command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "driver {:?} has an empty installCommand",
                    driver.id
                )));
            }
        }

        Ok(())
    }
}

/// Lowercased names a driver occupies in the work directory: the download
/// itself and, for archives, the directory it expands into
fn work_entries(artifact: &str) -> Vec<String> {
    let path = Path::new(artifact);
    let mut entries = vec![artifact.to_lowercase()];
    if is_archive(path) {
        entries.push(extraction_dir(path).to_string_lossy().to_lowercase());
    }
    entries
}

/// Returns the path to the config directory for ec2-driver-updater.
/// Uses $XDG_CONFIG_HOME/ec2-driver-updater if XDG_CONFIG_HOME is set,
/// otherwise the platform config directory,
/// or ./ec2-driver-updater if neither is available.
pub fn config_dir() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::config_dir())
}

/// Returns the path to the default config file.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

fn config_dir_with_env(xdg_config_home: Option<String>, platform_dir: Option<PathBuf>) -> PathBuf {
    let config_dir = xdg_config_home
        .map(PathBuf::from)
        .or(platform_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    config_dir.join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::types::{EligibilityRule, HostRules};
    use rstest::rstest;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn driver_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("{id} driver"),
            "downloadUrl": format!("https://example.com/{id}/Latest/{id}.zip"),
            "probeCommand": "Write-Host 1.0.0",
            "installCommand": format!("powershell.exe -File {id}\\install.ps1"),
            "versionUrl": format!("https://example.com/{id}.html"),
            "versionPattern": "\\d\\.\\d\\.\\d"
        })
    }

    #[test]
    fn updater_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<UpdaterConfig>(json!({
            "timeouts": {
                "probeSecs": 15
            }
        }))
        .unwrap();

        assert_eq!(result.timeouts.probe(), Duration::from_secs(15));
        assert_eq!(
            result.timeouts.install_secs,
            DEFAULT_INSTALL_TIMEOUT_SECS
        );
        assert_eq!(result.drivers, default_drivers());
        assert_eq!(result.metadata_url, DEFAULT_METADATA_URL);
    }

    #[test]
    fn updater_config_from_full_object_parses_all_fields() {
        let mut driver = driver_json("gpu");
        driver["eligibility"] = json!({ "policy": "allow", "prefixes": ["g4dn", "g5"] });

        let result = serde_json::from_value::<UpdaterConfig>(json!({
            "drivers": [driver],
            "probeShell": ["pwsh", "-Command"],
            "timeouts": { "probeSecs": 1, "downloadSecs": 2, "installSecs": 3 },
            "metadataUrl": "http://localhost:1338/instance-type"
        }))
        .unwrap();

        assert_eq!(result.drivers.len(), 1);
        assert_eq!(result.drivers[0].id, "gpu");
        assert_eq!(
            result.drivers[0].eligibility,
            EligibilityRule::Allow(HostRules::new(&[], &["g4dn", "g5"]))
        );
        assert_eq!(result.probe_shell, vec!["pwsh", "-Command"]);
        assert_eq!(
            result.timeouts,
            TimeoutConfig {
                probe_secs: 1,
                download_secs: 2,
                install_secs: 3
            }
        );
        assert_eq!(result.metadata_url, "http://localhost:1338/instance-type");
    }

    #[test]
    fn default_config_is_valid() {
        assert!(UpdaterConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_driver_ids() {
        let config = serde_json::from_value::<UpdaterConfig>(json!({
            "drivers": [driver_json("nvme"), driver_json("nvme")]
        }))
        .unwrap();

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn validate_rejects_invalid_pattern() {
        let mut driver = driver_json("pv");
        driver["versionPattern"] = json!("(\\d");
        let config =
            serde_json::from_value::<UpdaterConfig>(json!({ "drivers": [driver] })).unwrap();

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[rstest]
    #[case("https://one.example.com/x/Driver.zip", "https://two.example.com/y/Driver.zip")]
    #[case("https://one.example.com/x/Driver.zip", "https://two.example.com/y/DRIVER.ZIP")]
    #[case("https://one.example.com/x/Driver.zip", "https://two.example.com/y/driver")]
    #[case("https://one.example.com/x/setup.msi", "https://two.example.com/y/Setup.MSI")]
    fn validate_rejects_drivers_sharing_work_paths(#[case] first: &str, #[case] second: &str) {
        let mut alpha = driver_json("alpha");
        alpha["downloadUrl"] = json!(first);
        let mut beta = driver_json("beta");
        beta["downloadUrl"] = json!(second);
        let config =
            serde_json::from_value::<UpdaterConfig>(json!({ "drivers": [alpha, beta] })).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(msg)) if msg.contains("\"alpha\"") && msg.contains("\"beta\"")
        ));
    }

    #[test]
    fn validate_accepts_distinct_bundles_with_shared_directories() {
        let mut alpha = driver_json("alpha");
        alpha["downloadUrl"] = json!("https://example.com/Latest/Alpha.zip");
        let mut beta = driver_json("beta");
        beta["downloadUrl"] = json!("https://example.com/Latest/Beta.zip");
        let config =
            serde_json::from_value::<UpdaterConfig>(json!({ "drivers": [alpha, beta] })).unwrap();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_driver_table() {
        let config = serde_json::from_value::<UpdaterConfig>(json!({ "drivers": [] })).unwrap();

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({ "drivers": [driver_json("ena")], "probeShell": ["sh", "-c"] })
        )
        .unwrap();

        let config = UpdaterConfig::load(file.path()).unwrap();

        assert_eq!(config.drivers[0].id, "ena");
        assert_eq!(config.probe_shell, vec!["sh", "-c"]);
    }

    #[test]
    fn load_reports_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(matches!(
            UpdaterConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn discover_fails_for_missing_explicit_file() {
        let result = UpdaterConfig::discover(Some(Path::new("/nonexistent/ec2-driver-updater.json")));

        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn config_dir_with_env_uses_xdg_config_home_when_set() {
        let path = config_dir_with_env(
            Some("/tmp/test-config".to_string()),
            Some(PathBuf::from("/home/user/.config")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-config/ec2-driver-updater"));
    }

    #[test]
    fn config_dir_with_env_falls_back_to_platform_dir() {
        let path = config_dir_with_env(None, Some(PathBuf::from("C:\\Users\\admin\\AppData")));

        assert_eq!(
            path,
            PathBuf::from("C:\\Users\\admin\\AppData").join("ec2-driver-updater")
        );
    }

    #[test]
    fn config_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = config_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./ec2-driver-updater"));
    }
}

//! Driver tables, version pages and bundles used across tests

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use ec2_driver_updater::config::UpdaterConfig;
use ec2_driver_updater::driver::types::{DriverSpec, EligibilityRule, HostRules};
use ec2_driver_updater::update::Orchestrator;

use super::fakes::{FakeFetcher, FakeRunner, PROBE_SHELL};

pub const BASE_URL: &str = "https://drivers.example.test";

pub fn version_url(id: &str) -> String {
    format!("{BASE_URL}/{id}/versions.html")
}

pub fn download_url(id: &str) -> String {
    format!("{BASE_URL}/{id}/Latest/{}", bundle_name(id))
}

/// Bundle file name for a test driver: "nvme" -> "Nvme.zip"
pub fn bundle_name(id: &str) -> String {
    let mut chars = id.chars();
    let first = chars.next().map(|c| c.to_ascii_uppercase());
    format!("{}{}.zip", first.into_iter().collect::<String>(), chars.as_str())
}

pub fn probe(id: &str) -> String {
    format!("probe-{id}")
}

pub fn installer(id: &str) -> String {
    format!("install-{id}")
}

pub fn driver(id: &str, eligibility: EligibilityRule) -> DriverSpec {
    DriverSpec {
        id: id.to_string(),
        name: format!("Test {id} driver"),
        download_url: download_url(id),
        probe_command: probe(id),
        install_command: format!(r"{} -File {}\install.ps1 -NoReboot", installer(id), id),
        version_url: version_url(id),
        version_pattern: r"\d+\.\d+\.\d+".to_string(),
        eligibility,
    }
}

/// nvme (allow-listed on m5), pv (everywhere), ena (denied on t2)
pub fn driver_table() -> Vec<DriverSpec> {
    vec![
        driver("nvme", EligibilityRule::Allow(HostRules::new(&[], &["m5"]))),
        driver("pv", EligibilityRule::default()),
        driver("ena", EligibilityRule::Deny(HostRules::new(&[], &["t2"]))),
    ]
}

/// A release-notes page mentioning the given versions
pub fn version_page(versions: &[&str]) -> String {
    let mut page = String::from("<html><body><table>");
    for version in versions {
        page.push_str(&format!("<tr><td>{version}</td><td>Bug fixes</td></tr>"));
    }
    page.push_str("</table></body></html>");
    page
}

/// A zip holding an install script under a directory named after the driver
pub fn bundle(id: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer
        .start_file(format!("{id}/install.ps1"), options)
        .unwrap();
    writer.write_all(b"Write-Host 'installing'").unwrap();
    writer.start_file(format!("{id}/driver.inf"), options).unwrap();
    writer.write_all(b"[Version]").unwrap();
    writer.finish().unwrap().into_inner()
}

pub fn config(drivers: Vec<DriverSpec>) -> UpdaterConfig {
    UpdaterConfig {
        drivers,
        probe_shell: vec![PROBE_SHELL.to_string(), "-Command".to_string()],
        ..UpdaterConfig::default()
    }
}

pub fn orchestrator(
    config: &UpdaterConfig,
    fetcher: Arc<FakeFetcher>,
    runner: Arc<FakeRunner>,
    work_dir: PathBuf,
) -> Orchestrator {
    Orchestrator::from_config(config, fetcher, runner, work_dir)
}

//! Built-in table of AWS Windows drivers

use crate::driver::types::{DriverSpec, EligibilityRule, HostRules};

const DOWNLOAD_BASE_URL: &str = "https://s3.amazonaws.com/ec2-windows-drivers-downloads";
const GUIDE_BASE_URL: &str = "https://docs.aws.amazon.com/AWSEC2/latest/WindowsGuide";

/// The documentation pages print single-digit dotted versions.
const VERSION_PATTERN: &str = r"\d\.\d\.\d";

/// Nitro instance families, which expose EBS volumes as NVMe devices
/// (https://docs.aws.amazon.com/AWSEC2/latest/WindowsGuide/instance-types.html#ec2-nitro-instances)
const NVME_PREFIXES: &[&str] = &[
    "c5", "c5a", "c5ad", "c5d", "c5n", "c6a", "c6i", "c6id", "d3", "d3en", "g4", "g4ad", "g5",
    "i3en", "i4i", "m5", "m5a", "m5ad", "m5d", "m5dn", "m5n", "m5zn", "m6a", "m6i", "m6id", "r5",
    "r5a", "r5ad", "r5b", "r5d", "r5dn", "r5n", "r6i", "r6id", "t3", "t3a", "x2idn", "x2iedn",
    "x2iezn", "z1d",
];

const NVME_CLASSES: &[&str] = &[
    "p3dn.24xlarge",
    "u-12tb1.112xlarge",
    "u-3tb1.56xlarge",
    "u-6tb1.112xlarge",
    "u-6tb1.56xlarge",
    "u-9tb1.112xlarge",
];

/// Families and sizes without ENA support
/// (https://docs.aws.amazon.com/AWSEC2/latest/WindowsGuide/enhanced-networking-ena.html)
const ENA_DENIED_PREFIXES: &[&str] = &["c4", "d2", "t2"];

const ENA_DENIED_CLASSES: &[&str] = &[
    "m4.large",
    "m4.xlarge",
    "m4.2xlarge",
    "m4.4xlarge",
    "m4.10xlarge",
];

/// Default driver table, in display and install order
pub fn default_drivers() -> Vec<DriverSpec> {
    vec![
        DriverSpec {
            id: "nvme".to_string(),
            name: "AWS NVMe driver".to_string(),
            download_url: format!("{DOWNLOAD_BASE_URL}/NVMe/Latest/AWSNVMe.zip"),
            probe_command: "$driver_ver = (Get-WmiObject Win32_PnPSignedDriver | ? {$_.Description -match 'AWS NVMe Elastic Block Storage Adapter'}).DriverVersion; if ($driver_ver) {Write-Host $($driver_ver)} else {Write-Host '1.0.0'}".to_string(),
            install_command: r"powershell.exe -NoProfile -File AWSNVMe\install.ps1 -NoReboot"
                .to_string(),
            version_url: format!("{GUIDE_BASE_URL}/aws-nvme-drivers.html"),
            version_pattern: VERSION_PATTERN.to_string(),
            eligibility: EligibilityRule::Allow(HostRules::new(NVME_CLASSES, NVME_PREFIXES)),
        },
        DriverSpec {
            id: "pv".to_string(),
            name: "AWS PV driver".to_string(),
            download_url: format!("{DOWNLOAD_BASE_URL}/AWSPV/Latest/AWSPVDriver.zip"),
            probe_command:
                "(Get-WmiObject -Class win32_Product | ? {$_.name -match 'AWS PV Drivers'}).Version"
                    .to_string(),
            install_command:
                r"powershell.exe -NoProfile -File AWSPVDriver\install.ps1 -Quiet -NoReboot"
                    .to_string(),
            version_url: format!("{GUIDE_BASE_URL}/xen-drivers-overview.html"),
            version_pattern: VERSION_PATTERN.to_string(),
            eligibility: EligibilityRule::default(),
        },
        DriverSpec {
            id: "ena".to_string(),
            name: "AWS ENA network driver".to_string(),
            download_url: format!("{DOWNLOAD_BASE_URL}/ENA/Latest/AwsEnaNetworkDriver.zip"),
            probe_command: "(Get-WmiObject Win32_PnPSignedDriver | ? {$_.FriendlyName -match 'Amazon Elastic Network Adapter'}).DriverVersion".to_string(),
            install_command: r"powershell.exe -NoProfile -File AwsEnaNetworkDriver\install.ps1"
                .to_string(),
            version_url: format!("{GUIDE_BASE_URL}/enhanced-networking-ena.html"),
            version_pattern: VERSION_PATTERN.to_string(),
            eligibility: EligibilityRule::Deny(HostRules::new(
                ENA_DENIED_CLASSES,
                ENA_DENIED_PREFIXES,
            )),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::collections::HashSet;

    #[test]
    fn default_drivers_have_unique_ids_in_install_order() {
        let ids: Vec<_> = default_drivers().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["nvme", "pv", "ena"]);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
    }

    #[test]
    fn default_drivers_have_valid_patterns_and_zip_downloads() {
        for driver in default_drivers() {
            assert!(Regex::new(&driver.version_pattern).is_ok(), "{}", driver.id);
            let artifact = driver.artifact_name().unwrap();
            assert!(artifact.ends_with(".zip"), "{}", driver.id);
        }
    }
}

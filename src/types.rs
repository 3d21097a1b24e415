use crate::install::{DEFAULT_BINARY_NAME, DEFAULT_PROBE_TIMEOUT};
use crate::source::github::DEFAULT_API_BASE;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REPOSITORY: &str = "cndrsdrmn/go-spreadsheet";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallerSettings {
    #[serde(default = "default_repository")]
    pub repository: String,
    #[serde(default = "default_binary_name")]
    pub binary_name: String,
    #[serde(default = "default_bin_dir")]
    pub bin_dir: String,
    #[serde(default = "default_vendor_bin_dir", alias = "vendor_dir")]
    pub vendor_bin_dir: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_version_probe_timeout_secs")]
    pub version_probe_timeout_secs: u64,
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}
fn default_binary_name() -> String {
    DEFAULT_BINARY_NAME.to_string()
}
fn default_bin_dir() -> String {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("spreadsheet-installer")
        .join("bin")
        .to_string_lossy()
        .to_string()
}
fn default_vendor_bin_dir() -> String {
    std::path::Path::new("vendor")
        .join("bin")
        .to_string_lossy()
        .to_string()
}
fn default_api_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_version_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_secs()
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            binary_name: default_binary_name(),
            bin_dir: default_bin_dir(),
            vendor_bin_dir: default_vendor_bin_dir(),
            api_base_url: default_api_base_url(),
            version_probe_timeout_secs: default_version_probe_timeout_secs(),
        }
    }
}

use crate::types::InstallerSettings;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

pub const APP_NAME: &str = "spreadsheet-installer";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "SPREADSHEET_INSTALLER_CONFIG";

pub const SETTING_KEYS: &[&str] = &[
    "repository",
    "binary_name",
    "bin_dir",
    "vendor_bin_dir",
    "api_base_url",
    "version_probe_timeout_secs",
];

pub fn get_user_config_dir() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join(APP_NAME);
    Ok(path)
}

pub fn get_config_file_path() -> Result<PathBuf> {
    let path = match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) => PathBuf::from(path),
        None => get_user_config_dir()?.join(CONFIG_FILE_NAME),
    };
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

/// Settings exactly as stored on disk, defaults for anything missing.
pub fn load_settings_file() -> Result<InstallerSettings> {
    let config_path = get_config_file_path()?;

    if !config_path.exists() {
        return Ok(InstallerSettings::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Could not read config file at {}", config_path.display()))?;

    serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")
}

/// Settings from disk with environment overrides applied on top.
pub fn load_settings() -> Result<InstallerSettings> {
    let mut settings = load_settings_file()?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

pub fn apply_env_overrides(settings: &mut InstallerSettings) {
    if let Ok(repository) = std::env::var("SPREADSHEET_INSTALLER_REPOSITORY") {
        settings.repository = repository;
    }

    if let Ok(bin_dir) = std::env::var("SPREADSHEET_INSTALLER_BIN_DIR") {
        settings.bin_dir = bin_dir;
    }

    if let Ok(vendor_bin_dir) = std::env::var("SPREADSHEET_INSTALLER_VENDOR_BIN_DIR") {
        settings.vendor_bin_dir = vendor_bin_dir;
    }

    if let Ok(api_base_url) = std::env::var("SPREADSHEET_INSTALLER_API_URL") {
        settings.api_base_url = api_base_url;
    }

    if let Ok(timeout) = std::env::var("SPREADSHEET_INSTALLER_PROBE_TIMEOUT") {
        match timeout.parse::<u64>() {
            Ok(secs) => settings.version_probe_timeout_secs = secs,
            Err(_) => tracing::warn!(
                "Ignoring SPREADSHEET_INSTALLER_PROBE_TIMEOUT={}: not a number of seconds",
                timeout
            ),
        }
    }
}

pub fn save_settings(settings: &InstallerSettings) -> Result<()> {
    let config_path = get_config_file_path()?;
    let config_dir = config_path
        .parent()
        .ok_or_else(|| anyhow!("Invalid config path"))?;

    fs::create_dir_all(config_dir)?;

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(&config_path, content)?;

    Ok(())
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}

pub fn get_setting(settings: &InstallerSettings, key: &str) -> Option<String> {
    let value = match normalize_key(key).as_str() {
        "repository" => settings.repository.clone(),
        "binary_name" => settings.binary_name.clone(),
        "bin_dir" => settings.bin_dir.clone(),
        "vendor_bin_dir" => settings.vendor_bin_dir.clone(),
        "api_base_url" => settings.api_base_url.clone(),
        "version_probe_timeout_secs" => settings.version_probe_timeout_secs.to_string(),
        _ => return None,
    };
    Some(value)
}

pub fn set_setting(settings: &mut InstallerSettings, key: &str, value: &str) -> Result<()> {
    match normalize_key(key).as_str() {
        "repository" => settings.repository = value.to_string(),
        "binary_name" => settings.binary_name = value.to_string(),
        "bin_dir" => settings.bin_dir = value.to_string(),
        "vendor_bin_dir" => settings.vendor_bin_dir = value.to_string(),
        "api_base_url" => settings.api_base_url = value.to_string(),
        "version_probe_timeout_secs" => {
            settings.version_probe_timeout_secs = value
                .parse::<u64>()
                .with_context(|| format!("Invalid value for '{}': {}", key, value))?;
        }
        other => return Err(unknown_key(other)),
    }
    Ok(())
}

pub fn unset_setting(settings: &mut InstallerSettings, key: &str) -> Result<()> {
    let defaults = InstallerSettings::default();
    let key = normalize_key(key);
    let value = get_setting(&defaults, &key).ok_or_else(|| unknown_key(&key))?;
    set_setting(settings, &key, &value)
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow!(
        "'{}' is not a valid configuration setting. Valid settings: {}",
        key,
        SETTING_KEYS.join(", ")
    )
}

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::error::{PassVaultError, Result};
use crate::security::GeneratorOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Seconds of inactivity before the vault locks itself.
    pub auto_lock_secs: u64,
    /// Seconds before a copied secret is wiped from the clipboard.
    pub clipboard_clear_secs: u64,
    pub default_generator: GeneratorOptions,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            auto_lock_secs: 300,
            clipboard_clear_secs: 30,
            default_generator: GeneratorOptions::default(),
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<()> {
        if self.auto_lock_secs == 0 {
            return Err(PassVaultError::Config(
                "auto_lock_secs must be greater than zero".into(),
            ));
        }
        if self.clipboard_clear_secs == 0 {
            return Err(PassVaultError::Config(
                "clipboard_clear_secs must be greater than zero".into(),
            ));
        }
        self.default_generator
            .validate()
            .map_err(|e| PassVaultError::Config(format!("default_generator: {}", e)))
    }
}

pub fn load_settings(paths: &VaultPaths) -> Result<AppSettings> {
    let path = paths.settings();

    if !path.exists() {
        return Ok(AppSettings::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let settings: AppSettings = serde_json::from_str(&content)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_settings(paths: &VaultPaths, settings: &AppSettings) -> Result<()> {
    settings.validate()?;
    paths.ensure_data_dir()?;
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(paths.settings(), content)?;
    Ok(())
}

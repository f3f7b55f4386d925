//! Configuration management
//!
//! Settings live in `settings.json` inside the harbor directory:
//! ```json
//! {
//!   "app": {
//!     "demoMode": false,
//!     "fiscalYearStartMonth": 4,
//!     "syncIntervalSecs": 0,
//!     "pageSize": 100,
//!     "serverUrl": "https://ledger.example.com/api",
//!     "apiToken": "..."
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

fn default_fiscal_year_start_month() -> u32 {
    4
}

fn default_page_size() -> i64 {
    100
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    /// First month of the fiscal year used for year-to-date aggregates
    #[serde(default = "default_fiscal_year_start_month")]
    fiscal_year_start_month: u32,
    /// Periodic sync interval in seconds; 0 means manual-only
    #[serde(default)]
    sync_interval_secs: u64,
    /// Transactions requested per page during pull
    #[serde(default = "default_page_size")]
    page_size: i64,
    #[serde(default)]
    server_url: Option<String>,
    #[serde(default)]
    api_token: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            demo_mode: false,
            fiscal_year_start_month: default_fiscal_year_start_month(),
            sync_interval_secs: 0,
            page_size: default_page_size(),
            server_url: None,
            api_token: None,
            other: HashMap::new(),
        }
    }
}

/// Harbor configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    pub fiscal_year_start_month: u32,
    pub sync_interval_secs: u64,
    pub page_size: i64,
    pub server_url: Option<String>,
    pub api_token: Option<String>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        let raw = SettingsFile::default();
        Self {
            demo_mode: false,
            fiscal_year_start_month: default_fiscal_year_start_month(),
            sync_interval_secs: 0,
            page_size: default_page_size(),
            server_url: None,
            api_token: None,
            _raw_settings: raw,
        }
    }
}

impl Config {
    /// Load config from the harbor directory
    ///
    /// Demo mode can be enabled via:
    /// 1. Settings file (hb demo on)
    /// 2. Environment variable HARBOR_DEMO_MODE (for CI/testing)
    pub fn load(harbor_dir: &Path) -> Result<Self> {
        let settings_path = harbor_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        // Check env var for demo mode override (for CI/testing)
        let demo_mode = match std::env::var("HARBOR_DEMO_MODE").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        Ok(Self {
            demo_mode,
            fiscal_year_start_month: raw.app.fiscal_year_start_month.clamp(1, 12),
            sync_interval_secs: raw.app.sync_interval_secs,
            page_size: raw.app.page_size.max(1),
            server_url: raw.app.server_url.clone(),
            api_token: raw.app.api_token.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the harbor directory, preserving settings this
    /// module does not manage
    pub fn save(&self, harbor_dir: &Path) -> Result<()> {
        let settings_path = harbor_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.app.demo_mode = self.demo_mode;
        settings.app.fiscal_year_start_month = self.fiscal_year_start_month;
        settings.app.sync_interval_secs = self.sync_interval_secs;
        settings.app.page_size = self.page_size;
        settings.app.server_url = self.server_url.clone();
        settings.app.api_token = self.api_token.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Enable demo mode
    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    /// Disable demo mode
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fiscal_year_start_month, 4);
        assert_eq!(config.sync_interval_secs, 0);
        assert_eq!(config.page_size, 100);
        assert!(!config.demo_mode);
    }

    #[test]
    fn test_lenient_load_of_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app":{"fiscalYearStartMonth":1,"theme":"dark"},"future":{"x":1}}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.fiscal_year_start_month, 1);
    }

    #[test]
    fn test_save_roundtrip_preserves_unmanaged_app_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app":{"demoMode":false,"theme":"dark"}}"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.enable_demo_mode();
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["app"]["demoMode"], serde_json::json!(true));
        assert_eq!(value["app"]["theme"], serde_json::json!("dark"));
    }
}

use crate::api::constants::{DEFAULT_API_URL, MAX_PAGE_SIZE};
use crate::automation::engine::DEFAULT_HISTORY_MULTIPLE;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(skip)]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,
    #[serde(default = "default_item_timeout_secs")]
    pub item_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_recent_executions")]
    pub recent_executions: usize,
    #[serde(default = "default_history_multiple")]
    pub history_multiple: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_format")]
    pub default_format: String,
}

fn default_bulk_concurrency() -> usize {
    4
}

fn default_item_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_recent_executions() -> usize {
    10
}

fn default_history_multiple() -> usize {
    DEFAULT_HISTORY_MULTIPLE
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_format() -> String {
    "table".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bulk_concurrency: default_bulk_concurrency(),
            item_timeout_secs: default_item_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            recent_executions: default_recent_executions(),
            history_multiple: default_history_multiple(),
            page_size: default_page_size(),
            default_format: default_format(),
        }
    }
}

impl Settings {
    pub const NAMES: [&'static str; 7] = [
        "bulk-concurrency",
        "item-timeout-secs",
        "request-timeout-secs",
        "recent-executions",
        "history-multiple",
        "page-size",
        "default-format",
    ];

    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Workflow executions kept per project in the definitions file
    pub fn execution_history(&self) -> usize {
        self.recent_executions.saturating_mul(self.history_multiple)
    }

    pub fn get(&self, name: &str) -> Result<String> {
        let value = match name {
            "bulk-concurrency" => self.bulk_concurrency.to_string(),
            "item-timeout-secs" => self.item_timeout_secs.to_string(),
            "request-timeout-secs" => self.request_timeout_secs.to_string(),
            "recent-executions" => self.recent_executions.to_string(),
            "history-multiple" => self.history_multiple.to_string(),
            "page-size" => self.page_size.to_string(),
            "default-format" => self.default_format.clone(),
            _ => anyhow::bail!("Unknown setting: {}", name),
        };
        Ok(value)
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "bulk-concurrency" => self.bulk_concurrency = parse_positive(name, value)?,
            "item-timeout-secs" => self.item_timeout_secs = parse_positive(name, value)?,
            "request-timeout-secs" => self.request_timeout_secs = parse_positive(name, value)?,
            "recent-executions" => self.recent_executions = parse_positive(name, value)?,
            "history-multiple" => self.history_multiple = parse_positive(name, value)?,
            "page-size" => {
                let size: u32 = parse_positive(name, value)?;
                if size > MAX_PAGE_SIZE {
                    anyhow::bail!("page-size must be at most {}", MAX_PAGE_SIZE);
                }
                self.page_size = size;
            }
            "default-format" => {
                let format = value.trim().to_ascii_lowercase();
                if format != "table" && format != "json" {
                    anyhow::bail!("default-format must be 'table' or 'json', got '{}'", value);
                }
                self.default_format = format;
            }
            _ => anyhow::bail!("Unknown setting: {}", name),
        }
        Ok(())
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let defaults = Settings::default();
        let value = defaults.get(name)?;
        self.set(name, &value)
    }
}

fn parse_positive<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let parsed: T = value.trim().parse().map_err(|_| {
        anyhow::anyhow!("Invalid value for {}: '{}'. Must be a positive integer.", name, value)
    })?;
    if parsed <= T::default() {
        anyhow::bail!("Invalid value for {}: '{}'. Must be a positive integer.", name, value);
    }
    Ok(parsed)
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("gh-projects")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".gh-projects")
        };
        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);

        if !path.exists() {
            info!("Config file doesn't exist, using defaults");
            return Ok(Self {
                path: Some(path.to_path_buf()),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.path = Some(path.to_path_buf());

        debug!("Loaded config (token stored: {})", config.auth.token.is_some());
        Ok(config)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Default workflow definitions file, next to the config file
    pub fn workflows_path(&self) -> Result<PathBuf> {
        let config_path = match &self.path {
            Some(path) => path.clone(),
            None => Self::get_config_path()?,
        };
        Ok(config_path.with_file_name("workflows.json"))
    }

    /// Write back to the file this config was loaded from
    pub fn save(&self) -> Result<()> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => Self::get_config_path()?,
        };
        debug!("Saving config to: {:?}", path);

        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
                info!("Created config directory: {:?}", dir);
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        info!("Config saved successfully");
        Ok(())
    }

    pub fn set_token(&mut self, token: String) -> Result<()> {
        info!("Storing API token in config");
        self.auth.token = Some(token);
        self.save()
    }

    pub fn clear_token(&mut self) -> Result<bool> {
        let had_token = self.auth.token.take().is_some();
        if had_token {
            info!("Removed stored API token");
            self.save()?;
        }
        Ok(had_token)
    }

    pub fn update_setting(&mut self, name: &str, value: &str) -> Result<()> {
        info!("Setting {} to {}", name, value);
        self.settings.set(name, value)?;
        self.save()
    }

    pub fn reset_setting(&mut self, name: &str) -> Result<()> {
        info!("Resetting setting: {}", name);
        self.settings.reset(name)?;
        self.save()
    }

    pub fn reset_all_settings(&mut self) -> Result<()> {
        info!("Resetting all settings to defaults");
        self.settings = Settings::default();
        self.save()
    }
}

/// `load_config` module: loads the static YAML config and adapts it into the core
/// [`Config`] plus the connection settings for the library API and the sheet.
///
/// This is the only place where the user's YAML is parsed and the only place that
/// reads secrets from the environment.
///
/// # Responsibilities
/// - Parse the YAML file into typed sections (`audible`, `filters`, `sheet`)
/// - Validate what can be validated before any network call (locale, page size)
/// - Inject the Sheets bearer token from `GOOGLE_SHEETS_TOKEN` when a sync needs it
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, Result};
use audible2sheet_core::config::Config;
use audible2sheet_core::fetch::FetchOptions;
use audible2sheet_core::normalize::FilterConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::audible::{marketplace_tld, AudibleConfig, DEFAULT_LOCALE};
use crate::sheet::SheetConfig;

/// Environment variable holding the Google Sheets bearer token.
pub const SHEETS_TOKEN_ENV: &str = "GOOGLE_SHEETS_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub root_dir: PathBuf,
    pub audible: AudibleSection,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub sheet: Option<SheetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudibleSection {
    #[serde(default = "default_locale")]
    pub locale: String,
    pub session_file: PathBuf,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

impl CliConfig {
    /// The settings the core pipeline runs with.
    pub fn core_config(&self) -> Config {
        let defaults = FetchOptions::default();
        Config {
            root_dir: self.root_dir.clone(),
            fetch: FetchOptions {
                page_size: self.audible.page_size.unwrap_or(defaults.page_size),
                max_pages: self.audible.max_pages.unwrap_or(defaults.max_pages),
            },
            filters: self.filters.clone(),
        }
    }

    pub fn audible(&self) -> AudibleConfig {
        AudibleConfig {
            locale: self.audible.locale.clone(),
            session_file: self.audible.session_file.clone(),
        }
    }

    /// The `sheet` section, which only `sync` requires.
    pub fn sheet(&self) -> Result<&SheetConfig> {
        self.sheet.as_ref().ok_or_else(|| {
            error!("Config has no sheet section");
            anyhow!("The config file has no `sheet` section; it is required for sync")
        })
    }
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &CliConfig) -> Result<()> {
    if marketplace_tld(&config.audible.locale).is_none() {
        error!(locale = %config.audible.locale, "Unknown marketplace locale");
        return Err(anyhow!(
            "Unknown audible locale {:?}; expected one of us, uk, de, fr, ca, au, in, it, jp, es",
            config.audible.locale
        ));
    }
    if config.audible.page_size == Some(0) {
        error!("audible.page_size must be positive");
        return Err(anyhow!("audible.page_size must be at least 1"));
    }
    if config.root_dir.as_os_str().is_empty() {
        error!("root_dir is empty");
        return Err(anyhow!("root_dir must not be empty"));
    }
    Ok(())
}

/// Reads the Sheets bearer token from the environment.
pub fn sheet_token() -> Result<String> {
    match std::env::var(SHEETS_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            info!(token_set = true, "Loaded sheets token from environment");
            Ok(token.trim().to_string())
        }
        Ok(_) => {
            error!(var = SHEETS_TOKEN_ENV, "Sheets token is empty");
            Err(anyhow!("{SHEETS_TOKEN_ENV} is set but empty"))
        }
        Err(e) => {
            error!(error = ?e, var = SHEETS_TOKEN_ENV, "Sheets token missing in environment");
            Err(anyhow!("{SHEETS_TOKEN_ENV} must be set to sync: {e}"))
        }
    }
}

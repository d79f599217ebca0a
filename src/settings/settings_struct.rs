use std::fs;
use std::path::Path;
use std::sync::{Arc, LazyLock, RwLock};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::utils::http::{Fetcher, HttpFetcher};

pub type SettingsResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Process-wide settings for the build pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the settings were loaded from, empty for defaults.
    #[serde(skip)]
    pub pref_path: String,

    // Templates
    pub clash_template: String,
    pub meta_template: String,
    pub template_dir: String,

    // Cache system
    pub cache_dir: String,
    pub cache_expire: u64,

    // Requests
    pub request_retry_times: u32,
    pub request_max_file_size: u64,
    pub request_timeout: u64,
    pub user_agent: String,

    pub log_level: String,
}

pub fn default_clash_template() -> String {
    "template_clash.yaml".to_string()
}

pub fn default_meta_template() -> String {
    "template_meta.yaml".to_string()
}

pub fn default_template_dir() -> String {
    "templates".to_string()
}

pub fn default_cache_dir() -> String {
    "subs".to_string()
}

pub fn default_cache_expire() -> u64 {
    300
}

pub fn default_retry_times() -> u32 {
    3
}

pub fn default_max_file_size() -> u64 {
    1024 * 1024 // 1MB
}

pub fn default_request_timeout() -> u64 {
    15
}

pub fn default_user_agent() -> String {
    "clash.meta".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            pref_path: String::new(),
            clash_template: default_clash_template(),
            meta_template: default_meta_template(),
            template_dir: default_template_dir(),
            cache_dir: default_cache_dir(),
            cache_expire: default_cache_expire(),
            request_retry_times: default_retry_times(),
            request_max_file_size: default_max_file_size(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Create a new settings instance with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current() -> Arc<Settings> {
        GLOBAL.read().unwrap_or_else(|e| e.into_inner()).clone()
    }


    /// Parse settings from TOML or YAML text.
    ///
    /// Anything that is a valid TOML table is read as TOML, so empty content
    /// yields the defaults.
    pub fn load_from_content(content: &str) -> SettingsResult<Self> {
        if toml::from_str::<toml::Table>(content).is_ok() {
            debug!("Loading settings as TOML");
            return Ok(toml::from_str(content)?);
        }
        debug!("Loading settings as YAML");
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load settings from file or URL
    pub fn load_from_file(path: &str) -> SettingsResult<Self> {
        let content = if path.starts_with("http://") || path.starts_with("https://") {
            let fetcher = HttpFetcher::new(
                Duration::from_secs(default_request_timeout()),
                default_max_file_size(),
            );
            let body = fetcher.get(path, &default_user_agent())?;
            String::from_utf8(body)?
        } else {
            fs::read_to_string(Path::new(path))?
        };
        let mut settings = Settings::load_from_content(&content)?;
        settings.pref_path = path.to_owned();
        Ok(settings)
    }
}

// Global settings instance
pub static GLOBAL: LazyLock<RwLock<Arc<Settings>>> =
    LazyLock::new(|| RwLock::new(Arc::new(Settings::new())));

fn replace_global(settings: Settings) {
    *GLOBAL.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(settings);
}

/// Update settings directly from file path with proper locking
pub fn update_settings_from_file(path: &str) -> SettingsResult<()> {
    let settings = Settings::load_from_file(path)?;
    replace_global(settings);
    Ok(())
}

pub fn update_settings_from_content(content: &str) -> SettingsResult<()> {
    let settings = Settings::load_from_content(content)?;
    replace_global(settings);
    Ok(())
}

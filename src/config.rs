use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::language::Language;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Values that mean "no key was configured".
const PLACEHOLDER_KEYS: &[&str] = &["PLACEHOLDER_GEMINI_API_KEY", "YOUR_GEMINI_API_KEY"];

/// Main configuration structure for the planner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display language used to steer prompts and day labels
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON blob per persisted key
    pub dir: PathBuf,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            temperature: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".nutri-planner"),
        }
    }
}

impl GeminiConfig {
    /// The API key, or `None` when it is blank or a known placeholder.
    pub fn credential(&self) -> Option<&str> {
        let key = self.api_key.trim();
        if key.is_empty() || PLACEHOLDER_KEYS.contains(&key) {
            None
        } else {
            Some(key)
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("NUTRI_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(Path::new(&config_path));

        config.apply_overrides(|name| env::var(name).ok());

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    fn from_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("Config file not found at {} - using defaults", path.display());
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides through `lookup`
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Gemini overrides; the legacy app variable is honoured as a fallback.
        // An exported-but-empty variable counts as unset.
        let key_var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(api_key) = key_var("GEMINI_API_KEY").or_else(|| key_var("GOOGLE_GEMINI_API_KEY"))
        {
            self.gemini.api_key = api_key;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url;
        }
        if let Some(temp) = lookup("GEMINI_TEMPERATURE") {
            if let Ok(t) = temp.parse() {
                self.gemini.temperature = Some(t);
            }
        }

        if let Some(lang) = lookup("NUTRI_LANGUAGE") {
            match lang.parse::<Language>() {
                Ok(l) => self.app.language = l,
                Err(e) => tracing::warn!("{} - keeping '{}'", e, self.app.language),
            }
        }

        if let Some(dir) = lookup("NUTRI_STORAGE_DIR") {
            self.storage.dir = PathBuf::from(dir);
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.gemini.model.trim().is_empty() {
            return Err("gemini.model cannot be empty".into());
        }
        if !self.gemini.base_url.starts_with("http") {
            return Err(format!("gemini.base_url '{}' is not an http(s) URL", self.gemini.base_url).into());
        }
        if let Some(t) = self.gemini.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err("gemini.temperature must be between 0.0 and 2.0".into());
            }
        }
        if self.gemini.credential().is_none() {
            return Err("GEMINI_API_KEY is not set - fetches will use fallback data".into());
        }
        Ok(())
    }
}

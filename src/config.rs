use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_COMMITS: usize = 100;

/// Runtime configuration, resolved once at startup and handed to every
/// component that needs it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_commits: usize,
    pub include_range_in_prompt: bool,
    pub workspace_root: PathBuf,
}

impl AppConfig {
    pub fn load(workspace_hint: &Path) -> AppResult<Self> {
        let stored = StoredConfig::load()?;
        Self::from_sources(workspace_hint, &stored, |key| env::var(key).ok())
    }

    /// Layers defaults, the stored file and environment lookups (highest wins).
    pub fn from_sources<F>(
        workspace_hint: &Path,
        stored: &StoredConfig,
        lookup: F,
    ) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = pick_value(
            &lookup,
            &["SHIPNOTE_API_KEY", "ANTHROPIC_API_KEY"],
            &stored.api_key,
        );
        let api_base_url = pick_value(&lookup, &["SHIPNOTE_API_URL"], &stored.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let model = pick_value(&lookup, &["SHIPNOTE_MODEL"], &stored.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout = pick_value(
            &lookup,
            &["SHIPNOTE_TIMEOUT_SECS"],
            &stored.request_timeout_secs,
        );
        let request_timeout_secs = match timeout {
            Some(raw) => parse_seconds("request timeout", &raw)?,
            None => 120,
        };
        let include_range = pick_value(&lookup, &["SHIPNOTE_INCLUDE_RANGE"], &stored.include_range);
        let include_range_in_prompt = match include_range {
            Some(raw) => parse_flag("include range", &raw)?,
            None => false,
        };

        Ok(Self {
            api_key,
            api_base_url,
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: Duration::from_secs(request_timeout_secs),
            connect_timeout: Duration::from_secs(30),
            max_commits: DEFAULT_MAX_COMMITS,
            include_range_in_prompt,
            workspace_root: workspace_hint.to_path_buf(),
        })
    }
}

fn pick_value<F>(
    lookup: &F,
    env_keys: &[&str],
    stored_value: &Option<String>,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env_keys
        .iter()
        .find_map(|key| lookup(*key).filter(|value| !value.trim().is_empty()))
        .or_else(|| stored_value.clone().filter(|value| !value.trim().is_empty()))
}

fn parse_seconds(field: &str, raw: &str) -> AppResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(AppError::Configuration(format!(
            "{field} must be a positive number of seconds, got '{raw}'"
        ))),
        Ok(secs) => Ok(secs),
    }
}

fn parse_flag(field: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Configuration(format!(
            "{field} must be true or false, got '{raw}'"
        ))),
    }
}

/// Values persisted by `shipnote config init`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_range: Option<String>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    if let Ok(dir) = env::var("SHIPNOTE_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(dir) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(dir).join("shipnote"));
    }
    if let Ok(home) = env::var("HOME").or_else(|_| env::var("USERPROFILE")) {
        return Ok(PathBuf::from(home).join(".config").join("shipnote"));
    }
    Err(AppError::Configuration(
        "no config directory found (tried SHIPNOTE_CONFIG_DIR, XDG_CONFIG_HOME, HOME)".to_string(),
    ))
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

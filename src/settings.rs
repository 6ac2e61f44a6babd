use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, PoisonError, RwLock};

use crate::gateway::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const CACHE_FILENAME: &str = "cache.json";
const APP_NAME: &str = "etymon";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Overrides `<data_dir>/etymon/cache.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// When set, records live in a bounded in-memory LRU instead of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Look up words inside links, buttons and other controls.
    #[serde(default)]
    pub allow_interactive_hover: bool,

    #[serde(default = "default_true")]
    pub neighbor_highlight: bool,

    #[serde(default = "default_true")]
    pub sentence_highlight: bool,

    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            allow_interactive_hover: false,
            neighbor_highlight: true,
            sentence_highlight: true,
            provider: ProviderSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

/// Set by `--config`; takes precedence over the platform config directory.
static CONFIG_PATH_OVERRIDE: LazyLock<RwLock<Option<PathBuf>>> =
    LazyLock::new(|| RwLock::new(None));

pub fn set_config_path(path: Option<PathBuf>) {
    *CONFIG_PATH_OVERRIDE
        .write()
        .unwrap_or_else(PoisonError::into_inner) = path;
}

pub fn config_path() -> Option<PathBuf> {
    CONFIG_PATH_OVERRIDE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .or_else(|| dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME)))
}

/// Default location of the persisted etymology cache.
pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .map(|data| data.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CACHE_FILENAME)
}

pub fn load_settings() {
    let Some(path) = config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = snapshot();
        save_settings_to_file(&settings, &path);
    }
}

fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                *SETTINGS.write().unwrap_or_else(PoisonError::into_inner) = settings;
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings() {
    let Some(path) = config_path() else {
        warn!("Could not determine config directory, cannot save settings");
        return;
    };
    let settings = snapshot();
    save_settings_to_file(&settings, &path);
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = match generate_settings_yaml(settings) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> Result<String, serde_yaml::Error> {
    let mut content = String::from(SETTINGS_HEADER);
    content.push_str(&serde_yaml::to_string(settings)?);
    Ok(content)
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# etymon settings
# ============================================================================
# allow_interactive_hover: look up words inside links, buttons and controls
# neighbor_highlight:      also highlight the words around the hovered one
# sentence_highlight:      also highlight the hovered word's sentence
# provider.api_key:        Gemini API key (GEMINI_API_KEY takes precedence)
# cache.path:              where looked-up etymologies are kept
# cache.capacity:          keep at most this many records, in memory only
#
"#;

// Public API for accessing/modifying settings

/// Copy of the current settings.
pub fn snapshot() -> Settings {
    SETTINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replaces the in-memory settings without saving them.
pub fn replace(settings: Settings) {
    *SETTINGS.write().unwrap_or_else(PoisonError::into_inner) = settings;
}

pub fn allow_interactive_hover() -> bool {
    SETTINGS
        .read()
        .map(|s| s.allow_interactive_hover)
        .unwrap_or(false)
}

pub fn set_allow_interactive_hover(allow: bool) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.allow_interactive_hover = allow;
    }
    save_settings();
}

pub fn is_neighbor_highlight() -> bool {
    SETTINGS.read().map(|s| s.neighbor_highlight).unwrap_or(true)
}

pub fn set_neighbor_highlight(enabled: bool) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.neighbor_highlight = enabled;
    }
    save_settings();
}

pub fn is_sentence_highlight() -> bool {
    SETTINGS.read().map(|s| s.sentence_highlight).unwrap_or(true)
}

pub fn set_sentence_highlight(enabled: bool) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.sentence_highlight = enabled;
    }
    save_settings();
}

pub fn get_provider() -> ProviderSettings {
    SETTINGS
        .read()
        .map(|s| s.provider.clone())
        .unwrap_or_default()
}

/// The API key from the environment, falling back to the settings file.
pub fn get_api_key() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .or_else(|| get_provider().api_key)
}

pub fn get_cache_settings() -> CacheSettings {
    SETTINGS
        .read()
        .map(|s| s.cache.clone())
        .unwrap_or_default()
}

pub fn get_cache_path() -> PathBuf {
    get_cache_settings().path.unwrap_or_else(default_cache_path)
}

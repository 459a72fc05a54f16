use liftlog_core::{Collection, Shape};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_NOTION_URL: &str = "https://api.notion.com";
const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Notion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    /// Integration token
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Value sent in the Notion-Version header
    pub api_version: String,
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_version: DEFAULT_NOTION_VERSION.to_string(),
            base_url: DEFAULT_NOTION_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NotionConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Directory backups are written to
    pub backup_dir: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub notion: NotionConfig,
    /// Collections to sync, in order
    pub collections: Vec<Collection>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    notion: Option<NotionConfig>,
    collections: Option<Vec<Collection>>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = Self::default_data_dir();

        // Start with defaults
        let mut database_path =
            ConfigValue::new(data_dir.join("liftlog.db"), ConfigSource::Default);
        let mut backup_dir = ConfigValue::new(data_dir.join("backups"), ConfigSource::Default);
        let mut config_file = None;
        let mut notion = NotionConfig::default();
        let mut collections = Vec::new();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                database_path = ConfigValue::new(resolve(&path, db_path), ConfigSource::File);
            }
            if let Some(dir) = file_config.backup_dir {
                backup_dir = ConfigValue::new(resolve(&path, dir), ConfigSource::File);
            }
            if let Some(notion_config) = file_config.notion {
                notion = notion_config;
            }
            if let Some(configured) = file_config.collections {
                collections = configured;
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("LIFTLOG_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("LIFTLOG_BACKUP_DIR") {
            backup_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(token) = std::env::var("LIFTLOG_NOTION_TOKEN") {
            notion.api_key = Some(token);
        }
        for shape in Shape::ALL {
            if let Ok(remote_id) = std::env::var(Self::collection_env_var(shape)) {
                set_remote_id(&mut collections, shape.collection_name(), remote_id);
            }
        }

        Ok(Self {
            database_path,
            backup_dir,
            config_file,
            notion,
            collections,
        })
    }

    /// Collections with a remote id, in configured order.
    pub fn syncable_collections(&self) -> Vec<Collection> {
        self.collections
            .iter()
            .filter(|c| !c.remote_id.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Names of configured collections whose remote id is still blank.
    pub fn unconfigured_collections(&self) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|c| c.remote_id.trim().is_empty())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Configured remote id for a collection, if set.
    pub fn remote_id(&self, name: &str) -> Option<&str> {
        self.collections
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.remote_id.trim())
            .filter(|id| !id.is_empty())
    }

    /// Environment variable holding a collection's remote id,
    /// e.g. `LIFTLOG_WORKOUT_LOG_DB`.
    pub fn collection_env_var(shape: Shape) -> String {
        format!(
            "LIFTLOG_{}_DB",
            shape.collection_name().to_ascii_uppercase()
        )
    }

    /// Writes a starter config file. Refuses to overwrite an existing one.
    pub fn init_file(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))?;
        }
        std::fs::write(path, config_template())
            .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e))
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/liftlog/
    /// - macOS: ~/Library/Application Support/liftlog/
    /// - Windows: %APPDATA%/liftlog/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftlog")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/liftlog/
    /// - macOS: ~/Library/Application Support/liftlog/
    /// - Windows: %APPDATA%/liftlog/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftlog")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve(config_path: &Path, value: PathBuf) -> PathBuf {
    if value.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&value))
            .unwrap_or(value)
    } else {
        value
    }
}

fn set_remote_id(collections: &mut Vec<Collection>, name: &str, remote_id: String) {
    match collections.iter_mut().find(|c| c.name == name) {
        Some(existing) => existing.remote_id = remote_id,
        None => collections.push(Collection::new(name, remote_id)),
    }
}

fn config_template() -> String {
    let mut template = String::from(
        "# liftlog configuration\n\
         # database_path: liftlog.db\n\
         # backup_dir: backups\n\
         \n\
         notion:\n\
         \x20 # api_key: secret_xxx  (or set LIFTLOG_NOTION_TOKEN)\n",
    );
    template.push_str(&format!("  api_version: \"{}\"\n", DEFAULT_NOTION_VERSION));
    template.push_str(&format!("  timeout_secs: {}\n\n", DEFAULT_TIMEOUT_SECS));
    template.push_str("collections:\n");
    for shape in Shape::ALL {
        template.push_str(&format!(
            "  - name: {}\n    remote_id: \"\"\n",
            shape.collection_name()
        ));
    }
    template
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    WriteError(PathBuf, std::io::Error),
    AlreadyExists(PathBuf),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::WriteError(path, e) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), e)
            }
            ConfigError::AlreadyExists(path) => {
                write!(f, "Config file '{}' already exists", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/greensite/config.toml)
//! 3. Environment variables (GREENSITE_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "GREENSITE";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Document store endpoint, e.g. `https://cloud.example.com/v1`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Project identifier sent with every request
    #[serde(default = "default_project_id")]
    pub project_id: String,

    /// Admin API key (required for provisioning, optional otherwise)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Database holding the settings/content/media collections
    #[serde(default = "default_database_id")]
    pub database_id: String,

    /// Storage bucket for media uploads
    #[serde(default = "default_bucket_id")]
    pub bucket_id: String,

    /// Directory for local state (snapshot file)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Retry budget for the initialization sequencer
    #[serde(default = "default_init_max_retries")]
    pub init_max_retries: u32,

    /// Retry budget for the realtime bridge
    #[serde(default = "default_bridge_max_retries")]
    pub bridge_max_retries: u32,

    /// Base delay between retries, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project_id: default_project_id(),
            api_key: None,
            database_id: default_database_id(),
            bucket_id: default_bucket_id(),
            data_dir: default_data_dir(),
            init_max_retries: default_init_max_retries(),
            bridge_max_retries: default_bridge_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (GREENSITE_ENDPOINT, GREENSITE_PROJECT_ID, ...)
    /// 2. Config file (~/.config/greensite/config.toml or GREENSITE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_ENDPOINT", ENV_PREFIX)) {
            self.endpoint = val;
        }

        if let Ok(val) = std::env::var(format!("{}_PROJECT_ID", ENV_PREFIX)) {
            self.project_id = val;
        }

        if let Ok(val) = std::env::var(format!("{}_API_KEY", ENV_PREFIX)) {
            self.api_key = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_DATABASE_ID", ENV_PREFIX)) {
            self.database_id = val;
        }

        if let Ok(val) = std::env::var(format!("{}_BUCKET_ID", ENV_PREFIX)) {
            self.bucket_id = val;
        }

        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with GREENSITE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("greensite")
            .join("config.toml")
    }

    /// Get the path to the local store snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("snapshot.json")
    }

    /// Base retry delay as a [`std::time::Duration`]
    pub fn retry_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_delay_ms)
    }

    /// Return the API key, or a configuration error when it is unset
    ///
    /// Provisioning and seeding talk to the admin API and cannot run
    /// without a key.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .context(
                "API key not configured. Set it with:\n  \
                 greensite config set api_key <key>\n  \
                 or export GREENSITE_API_KEY",
            )
    }
}

fn default_endpoint() -> String {
    "http://localhost/v1".to_string()
}

fn default_project_id() -> String {
    "greensite".to_string()
}

fn default_database_id() -> String {
    "main".to_string()
}

fn default_bucket_id() -> String {
    "media".to_string()
}

fn default_init_max_retries() -> u32 {
    5
}

fn default_bridge_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("greensite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap();
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            // Clear all the vars
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "GREENSITE_ENDPOINT",
        "GREENSITE_PROJECT_ID",
        "GREENSITE_API_KEY",
        "GREENSITE_DATABASE_ID",
        "GREENSITE_BUCKET_ID",
        "GREENSITE_DATA_DIR",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.endpoint, "http://localhost/v1");
        assert_eq!(config.database_id, "main");
        assert_eq!(config.bucket_id, "media");
        assert!(config.api_key.is_none());
        assert!(config.data_dir.ends_with("greensite"));
    }

    #[test]
    fn test_snapshot_path() {
        let config = Config::default();
        assert!(config.snapshot_path().ends_with("snapshot.json"));
    }

    #[test]
    fn test_env_override_endpoint() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GREENSITE_ENDPOINT", "https://store.example.com/v1");
        env::set_var("GREENSITE_PROJECT_ID", "recycling-site");
        config.apply_env_overrides();

        assert_eq!(config.endpoint, "https://store.example.com/v1");
        assert_eq!(config.project_id, "recycling-site");
    }

    #[test]
    fn test_env_override_api_key() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        assert!(config.api_key.is_none());

        env::set_var("GREENSITE_API_KEY", "secret-key");
        config.apply_env_overrides();
        assert_eq!(config.api_key.as_deref(), Some("secret-key"));

        // Empty string clears it
        env::set_var("GREENSITE_API_KEY", "");
        config.apply_env_overrides();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GREENSITE_DATA_DIR", "/tmp/greensite-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/greensite-test"));
    }

    #[test]
    fn test_require_api_key() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        assert!(config.require_api_key().is_err());

        config.api_key = Some("key".to_string());
        assert_eq!(config.require_api_key().unwrap(), "key");

        config.api_key = Some(String::new());
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            endpoint: "https://store.example.com/v1".to_string(),
            project_id: "recycling-site".to_string(),
            api_key: Some("key".to_string()),
            data_dir: PathBuf::from("/data/greensite"),
            ..Config::default()
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("endpoint"));
        assert!(toml_str.contains("project_id"));
        assert!(toml_str.contains("data_dir"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.endpoint, config.endpoint);
        assert_eq!(parsed.project_id, config.project_id);
        assert_eq!(parsed.data_dir, config.data_dir);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            endpoint = "https://store.example.com/v1"
            project_id = "recycling-site"
            database_id = "prod"
            data_dir = "/custom/data"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.endpoint, "https://store.example.com/v1");
        assert_eq!(config.project_id, "recycling-site");
        assert_eq!(config.database_id, "prod");
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        // Unspecified fields fall back to defaults
        assert_eq!(config.bucket_id, "media");
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("GREENSITE_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults when file doesn't exist
        assert_eq!(config.endpoint, "http://localhost/v1");
        assert!(config.api_key.is_none());
    }
}

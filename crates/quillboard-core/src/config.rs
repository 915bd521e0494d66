use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
///
/// Loaded from the TOML config file; missing fields fall back to
/// defaults so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load config from default location or fall back to defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            // No config file? Use defaults
            Ok(Self::default())
        }
    }

    /// Save config to disk
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("quillboard");

        Ok(config_dir.join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the admin API, including the /api prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:4040/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long post type definitions stay fresh, in minutes
    #[serde(default = "default_post_types_ttl")]
    pub post_types_ttl_mins: u64,

    /// How long field definitions stay fresh, in minutes
    #[serde(default = "default_fields_ttl")]
    pub fields_ttl_mins: u64,

    /// How long a user's effective permissions stay fresh, in minutes
    #[serde(default = "default_permissions_ttl")]
    pub permissions_ttl_mins: u64,
}

fn default_post_types_ttl() -> u64 {
    30 // post types rarely change mid-session
}

fn default_fields_ttl() -> u64 {
    15
}

fn default_permissions_ttl() -> u64 {
    10 // role edits should show up within a session
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            post_types_ttl_mins: default_post_types_ttl(),
            fields_ttl_mins: default_fields_ttl(),
            permissions_ttl_mins: default_permissions_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn post_types_ttl(&self) -> Duration {
        Duration::from_secs(self.post_types_ttl_mins * 60)
    }

    pub fn fields_ttl(&self) -> Duration {
        Duration::from_secs(self.fields_ttl_mins * 60)
    }

    pub fn permissions_ttl(&self) -> Duration {
        Duration::from_secs(self.permissions_ttl_mins * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:4040/api");
        assert_eq!(config.cache.post_types_ttl_mins, 30);
        assert_eq!(config.cache.fields_ttl_mins, 15);
        assert_eq!(config.cache.permissions_ttl_mins, 10);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("[api]\nbase_url = \"https://cms.example.com/api\"\n")
            .unwrap();
        assert_eq!(config.api.base_url, "https://cms.example.com/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.cache.post_types_ttl_mins, 30);
    }

    #[test]
    fn test_missing_tables_fall_back_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:4040/api");
        assert_eq!(config.cache.fields_ttl_mins, 15);

        let config: Config = toml::from_str("[cache]\nfields_ttl_mins = 5\n").unwrap();
        assert_eq!(config.cache.fields_ttl_mins, 5);
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("base_url"));
        assert!(toml.contains("post_types_ttl_mins"));
    }
}

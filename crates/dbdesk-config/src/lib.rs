use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Configuration for dbdesk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub mongo: MongoConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub redaction: RedactionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Reject every route that writes to a database
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,

    #[serde(default = "default_max_time_ms")]
    pub max_time_ms: u64,

    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    /// How long an idle cached client is reused
    #[serde(default = "default_client_ttl_secs")]
    pub client_ttl_secs: u64,

    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_find_limit")]
    pub find_default: i64,

    #[serde(default = "default_find_max")]
    pub find_max: i64,

    #[serde(default = "default_aggregate_limit")]
    pub aggregate_default: i64,

    #[serde(default = "default_aggregate_max")]
    pub aggregate_max: i64,

    #[serde(default = "default_insert_max")]
    pub insert_many_max: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key. The key itself
    /// never goes in this file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_max_memory_snippets")]
    pub max_memory_snippets: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Top-level fields dropped from AI payloads, on top of the built-in list
    #[serde(default)]
    pub extra_dropped_fields: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_only: false,
        }
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            server_selection_timeout_ms: default_server_selection_timeout_ms(),
            max_time_ms: default_max_time_ms(),
            max_pool_size: default_max_pool_size(),
            client_ttl_secs: default_client_ttl_secs(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            find_default: default_find_limit(),
            find_max: default_find_max(),
            aggregate_default: default_aggregate_limit(),
            aggregate_max: default_aggregate_max(),
            insert_many_max: default_insert_max(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            endpoint: default_endpoint(),
            max_memory_snippets: default_max_memory_snippets(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7717
}

fn default_server_selection_timeout_ms() -> u64 {
    6_000
}

fn default_max_time_ms() -> u64 {
    15_000
}

fn default_max_pool_size() -> u32 {
    5
}

fn default_client_ttl_secs() -> u64 {
    300
}

fn default_find_limit() -> i64 {
    100
}

fn default_find_max() -> i64 {
    5_000
}

fn default_aggregate_limit() -> i64 {
    1_000
}

fn default_aggregate_max() -> i64 {
    10_000
}

fn default_insert_max() -> usize {
    10_000
}

fn default_model() -> String {
    "gemini-1.5-pro-latest".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_GENERATIVE_AI_API_KEY".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_max_memory_snippets() -> usize {
    50
}

impl MongoConfig {
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    pub fn max_time(&self) -> Duration {
        Duration::from_millis(self.max_time_ms)
    }

    pub fn client_ttl(&self) -> Duration {
        Duration::from_secs(self.client_ttl_secs)
    }
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, writing the defaults there first if the
    /// file does not exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            info!("Wrote default config to {}", path.display());
            Ok(config)
        }
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "dbdesk", "dbdesk") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.dbdesk/config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.server.read_only);
        assert_eq!(config.mongo.max_pool_size, 5);
        assert_eq!(config.mongo.client_ttl(), Duration::from_secs(300));
        assert_eq!(config.mongo.limits.find_max, 5_000);
        assert_eq!(config.mongo.limits.insert_many_max, 10_000);
        assert_eq!(config.ai.api_key_env, "GOOGLE_GENERATIVE_AI_API_KEY");
        assert_eq!(config.ai.max_memory_snippets, 50);
        assert!(config.redaction.extra_dropped_fields.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.ai.model, config.ai.model);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [server]
            read_only = true

            [redaction]
            extra_dropped_fields = ["sessionDump"]
            "#,
        )
        .unwrap();

        assert!(parsed.server.read_only);
        assert_eq!(parsed.server.port, default_port());
        assert_eq!(parsed.mongo.limits.aggregate_max, 10_000);
        assert_eq!(parsed.redaction.extra_dropped_fields, ["sessionDump"]);
    }

    #[test]
    fn test_load_from_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.port, default_port());

        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().server.port, 9000);
    }
}

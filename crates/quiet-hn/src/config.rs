use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Stories shown on the front page.
    #[serde(default = "default_num_stories")]
    pub num_stories: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_item_capacity")]
    pub item_capacity: usize,
    #[serde(default = "default_ids_ttl")]
    pub ids_ttl_seconds: u64,
    #[serde(default = "default_ids_refresh_buffer")]
    pub ids_refresh_buffer_seconds: u64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(contents)?;
        if config.cache.item_capacity == 0 {
            return Err("cache.item_capacity must be > 0".into());
        }
        Ok(config)
    }

    /// Load `path` if it exists, otherwise (or on error) fall back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config");
                config
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load config, using defaults");
                Self::default()
            }
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CacheConfig {
    pub fn ids_ttl(&self) -> Duration {
        Duration::from_secs(self.ids_ttl_seconds)
    }

    pub fn ids_refresh_buffer(&self) -> Duration {
        Duration::from_secs(self.ids_refresh_buffer_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            num_stories: default_num_stories(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            item_capacity: default_item_capacity(),
            ids_ttl_seconds: default_ids_ttl(),
            ids_refresh_buffer_seconds: default_ids_refresh_buffer(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_num_stories() -> usize {
    30
}
fn default_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_max_concurrent() -> usize {
    crate::dispatcher::DEFAULT_WIDTH
}
fn default_item_capacity() -> usize {
    100
}
fn default_ids_ttl() -> u64 {
    10
}
fn default_ids_refresh_buffer() -> u64 {
    5
}

//! Daemon configuration, stored as `config.yaml` in the data directory.
//!
//! Missing fields fall back to serde defaults; the file is created on first
//! run and re-saved when a schema upgrade adds fields.

use serde::{Deserialize, Serialize};

use crate::semantic::{DEFAULT_CACHE_CAPACITY, DEFAULT_THRESHOLD};
use crate::storage::{BackendLocal, StorageManager};

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
/// Provider latency beyond a few seconds counts as a failed call.
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 5;
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EMBEDDING_ENDPOINT: &str = "http://127.0.0.1:8091/embed";

/// Configuration for semantic report search
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum similarity score for including a report [0.0, 1.0]
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Embedding cache capacity in entries; sized to the expected corpus
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Configuration for the external embedding provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding endpoint, e.g. "http://127.0.0.1:8091/embed"
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Expected vector dimensionality; 0 accepts whatever the provider
    /// returns (useful while the provider model is still being chosen)
    #[serde(default)]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
            dimensions: 0,
        }
    }
}

/// Configuration for the notification webhook
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook receiving (report, area) matches; empty disables delivery
    #[serde(default)]
    pub webhook: String,

    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook: String::new(),
            timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_embedding_endpoint() -> String {
    DEFAULT_EMBEDDING_ENDPOINT.to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    DEFAULT_EMBEDDING_TIMEOUT_SECS
}

fn default_notify_timeout_secs() -> u64 {
    DEFAULT_NOTIFY_TIMEOUT_SECS
}

impl Config {
    fn validate(&mut self) {
        if !(0.0..=1.0).contains(&self.search.threshold) {
            panic!(
                "search.threshold must be between 0.0 and 1.0, got {}",
                self.search.threshold
            );
        }

        if self.search.cache_capacity == 0 {
            panic!("search.cache_capacity must be greater than 0");
        }

        if self.embedding.timeout_secs == 0 {
            panic!("embedding.timeout_secs must be greater than 0");
        }

        if url::Url::parse(&self.embedding.endpoint).is_err() {
            panic!(
                "embedding.endpoint is not a valid url: '{}'",
                self.embedding.endpoint
            );
        }

        if !self.notify.webhook.is_empty() && url::Url::parse(&self.notify.webhook).is_err() {
            panic!("notify.webhook is not a valid url: '{}'", self.notify.webhook);
        }

        if self.listen.is_empty() {
            self.listen = default_listen();
        }
    }

    pub fn load_with(base_path: &str) -> Self {
        let store = BackendLocal::new(base_path).expect("cannot create data directory");

        // create new if does not exist
        if !store.exists("config.yaml") {
            store
                .write(
                    "config.yaml",
                    serde_yml::to_string(&Self::new_default())
                        .unwrap()
                        .as_bytes(),
                )
                .expect("cannot write default config");
        }

        let config_str = String::from_utf8(store.read("config.yaml").expect("cannot read config"))
            .expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();
        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let store = BackendLocal::new(&self.base_path).expect("cannot create data directory");

        let config_str = serde_yml::to_string(&self).unwrap();
        store
            .write("config.yaml", config_str.as_bytes())
            .expect("cannot write config");
    }

    /// Default config with real field defaults (derive(Default) would
    /// zero the listen address and endpoint).
    fn new_default() -> Self {
        Self {
            listen: default_listen(),
            search: SearchConfig::default(),
            embedding: EmbeddingConfig::default(),
            notify: NotifyConfig::default(),
            base_path: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new_default();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert!((config.search.threshold - 0.35).abs() < f32::EPSILON);
        assert_eq!(config.search.cache_capacity, 4096);
        assert_eq!(config.embedding.timeout_secs, 5);
        assert!(config.notify.webhook.is_empty());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yml::from_str("search:\n  threshold: 0.5\n").unwrap();
        assert!((config.search.threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.search.cache_capacity, 4096);
        assert_eq!(config.embedding.timeout_secs, 5);
    }

    #[test]
    fn test_load_with_creates_file_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap();

        let config = Config::load_with(base);
        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.listen, "0.0.0.0:8080");

        // Second load parses the file written by the first.
        let again = Config::load_with(base);
        assert_eq!(again.search.cache_capacity, config.search.cache_capacity);
    }

    #[test]
    #[should_panic(expected = "search.threshold")]
    fn test_invalid_threshold_panics() {
        let mut config = Config::new_default();
        config.search.threshold = 1.5;
        config.validate();
    }

    #[test]
    #[should_panic(expected = "embedding.endpoint")]
    fn test_invalid_endpoint_panics() {
        let mut config = Config::new_default();
        config.embedding.endpoint = "not a url".to_string();
        config.validate();
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tiered cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub memory: MemoryLayerConfig,
    pub remote: RemoteLayerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLayerConfig {
    pub enabled: bool,
    pub capacity: usize,
    /// 0 disables expiry
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLayerConfig {
    pub enabled: bool,
    pub url: String,
    pub prefix: String,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            memory: MemoryLayerConfig::default(),
            remote: RemoteLayerConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MemoryLayerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 10_000,
            ttl_secs: 60,
        }
    }
}

impl Default for RemoteLayerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://127.0.0.1:6379".to_string(),
            prefix: "tiercache:".to_string(),
            ttl_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl TierConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML document; missing sections take defaults
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: TierConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.memory.enabled && self.memory.capacity == 0 {
            anyhow::bail!("memory.capacity must be greater than 0");
        }
        if self.remote.enabled && self.remote.ttl_secs == 0 {
            anyhow::bail!("remote.ttl_secs must be greater than 0");
        }
        Ok(())
    }

    /// Memory layer TTL, None when expiry is disabled
    pub fn memory_ttl(&self) -> Option<Duration> {
        (self.memory.ttl_secs > 0).then(|| Duration::from_secs(self.memory.ttl_secs))
    }

    pub fn remote_ttl(&self) -> Duration {
        Duration::from_secs(self.remote.ttl_secs)
    }
}

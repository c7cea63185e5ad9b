use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub image: ImageConfig,
    pub worker: WorkerConfig,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub env: String,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Maximum accepted decoded image size in bytes
    pub max_size: u64,
    /// Maximum accepted frame dimension (width or height)
    pub max_dimension: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub min_workers: usize,
    pub max_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Total byte budget for cached analysis results
    pub max_size_bytes: u64,
    pub cleanup_interval_secs: u64,
    /// TTL applied to memoized analysis results
    pub result_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size_bytes: 32 * 1024 * 1024,
            cleanup_interval_secs: 60,
            result_ttl_secs: 300,
        }
    }
}

impl CacheSettings {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "emolens".to_string(),
                env: "development".to_string(),
                debug: false,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:8080".to_string()],
                rate_limit: RateLimitConfig {
                    requests_per_minute: 1000,
                    burst: 100,
                },
            },
            image: ImageConfig {
                max_size: 5 * 1024 * 1024,
                max_dimension: 4096,
            },
            worker: WorkerConfig {
                min_workers: 2,
                max_workers: 8,
            },
            cache: CacheSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Writes the default configuration to disk when the file does not
    /// exist yet. Environment overrides (`APP_ENV`, `DEBUG`, `PORT`) are
    /// applied here, once; no other component reads the process
    /// environment.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;

            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path))?
        } else {
            let default_config = Self::default();
            default_config.save(path)?;
            default_config
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(env_name) = env::var("APP_ENV") {
            if !env_name.is_empty() {
                self.app.env = env_name;
            }
        }
        if env::var("DEBUG").map(|v| v == "true").unwrap_or(false) {
            self.app.debug = true;
        }
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.app.name.is_empty() {
            return Err(anyhow::anyhow!("app.name is required in config"));
        }
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server.port must be non-zero"));
        }
        if self.image.max_size == 0 {
            return Err(anyhow::anyhow!("image.max_size must be positive"));
        }
        if self.cache.max_size_bytes == 0 {
            return Err(anyhow::anyhow!("cache.max_size_bytes must be positive"));
        }
        if self.cache.cleanup_interval_secs == 0 {
            return Err(anyhow::anyhow!("cache.cleanup_interval_secs must be positive"));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.app.env == "development"
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn missing_file_materializes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let path = path.to_str().unwrap();

        let config = Config::load(path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(Path::new(path).exists());

        // Reloading reads the file that was just written
        let reloaded = Config::load(path).unwrap();
        assert_eq!(reloaded.worker.min_workers, config.worker.min_workers);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrip_through_json() {
        let config = Config::default();
        let text = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.security.rate_limit.burst, 100);
    }
}

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

pub const DEFAULT_ADMIN_ID: &str = "admin";
pub const DEFAULT_ADMIN_SECRET: &str = "admin";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub refiner: RefinerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let configured_path =
            std::env::var("LUMINA_CONFIG").unwrap_or_else(|_| "config/app.toml".to_string());
        assert!(
            !configured_path.is_empty(),
            "Configuration path must be non-empty"
        );
        assert!(
            configured_path.len() < 4096,
            "Configuration path length exceeds hard limit"
        );

        let mut builder = Config::builder()
            .add_source(File::new(&configured_path, FileFormat::Toml).required(true));

        if let Ok(env_override) = std::env::var("LUMINA_ENV") {
            if !env_override.is_empty() {
                let env_file = format!("config/app.{}.toml", env_override);
                if Path::new(&env_file).exists() {
                    builder = builder.add_source(File::new(&env_file, FileFormat::Toml));
                }
            }
        }

        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, &configured_path))?;
        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize application configuration")?;

        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            if !api_key.is_empty() {
                config.refiner.api_key = Some(api_key);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        assert!(
            self.server.port > 0,
            "Server port must be greater than zero"
        );
        if self.storage.backend == StorageBackend::File {
            assert!(
                !self.storage.data_dir.as_os_str().is_empty(),
                "File storage requires a data directory"
            );
        }
        assert!(!self.auth.admin_id.is_empty(), "Admin id must be specified");
        assert!(
            !self.auth.admin_secret.is_empty(),
            "Admin secret must be specified"
        );
        self.auth.ensure_bounds()?;
        self.login.ensure_bounds()?;
        self.refiner.ensure_bounds()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(self.port != 0, "HTTP port cannot be zero");
        assert!(self.port < 65535, "HTTP port must be below 65535");
        SocketAddr::new(host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "StorageConfig::default_data_dir")]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("data")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: Self::default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_admin_id")]
    pub admin_id: String,
    #[serde(default = "AuthConfig::default_admin_secret")]
    pub admin_secret: String,
    #[serde(default)]
    pub simulated_latency_ms: u64,
}

impl AuthConfig {
    pub fn simulated_latency(&self) -> Duration {
        assert!(
            self.simulated_latency_ms <= 10_000,
            "Simulated latency cannot exceed 10 seconds"
        );
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn uses_default_credentials(&self) -> bool {
        self.admin_id == DEFAULT_ADMIN_ID && self.admin_secret == DEFAULT_ADMIN_SECRET
    }

    fn ensure_bounds(&self) -> Result<()> {
        assert!(self.admin_id.len() <= 256, "Admin id exceeds 256 bytes");
        assert!(
            self.admin_secret.len() <= 1024,
            "Admin secret exceeds 1024 bytes"
        );
        let _ = self.simulated_latency();
        Ok(())
    }

    fn default_admin_id() -> String {
        DEFAULT_ADMIN_ID.to_string()
    }

    fn default_admin_secret() -> String {
        DEFAULT_ADMIN_SECRET.to_string()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_id: Self::default_admin_id(),
            admin_secret: Self::default_admin_secret(),
            simulated_latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginConfig {
    #[serde(default = "LoginConfig::default_error_reset_ms")]
    pub error_reset_ms: u64,
}

impl LoginConfig {
    pub fn error_reset(&self) -> Duration {
        assert!(self.error_reset_ms > 0, "Error reset delay must be positive");
        assert!(
            self.error_reset_ms <= 60_000,
            "Error reset delay cannot exceed 60 seconds"
        );
        Duration::from_millis(self.error_reset_ms)
    }

    fn ensure_bounds(&self) -> Result<()> {
        let _ = self.error_reset();
        Ok(())
    }

    const fn default_error_reset_ms() -> u64 {
        2_000
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            error_reset_ms: Self::default_error_reset_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefinerConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "RefinerConfig::default_model")]
    pub model: String,
    #[serde(default = "RefinerConfig::default_base_url")]
    pub base_url: String,
    pub request_timeout_ms: Option<u64>,
}

impl RefinerConfig {
    pub fn request_timeout(&self) -> Duration {
        let millis = self.request_timeout_ms.unwrap_or(15_000);
        assert!(millis >= 100, "Refiner timeout must be at least 100ms");
        assert!(millis <= 120_000, "Refiner timeout cannot exceed 120 seconds");
        Duration::from_millis(millis)
    }

    fn ensure_bounds(&self) -> Result<()> {
        assert!(!self.model.is_empty(), "Refiner model must be specified");
        assert!(
            self.base_url.starts_with("http://") || self.base_url.starts_with("https://"),
            "Refiner base URL must be http(s)"
        );
        let _ = self.request_timeout();
        Ok(())
    }

    fn default_model() -> String {
        DEFAULT_GEMINI_MODEL.to_string()
    }

    fn default_base_url() -> String {
        DEFAULT_GEMINI_BASE_URL.to_string()
    }
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::default_model(),
            base_url: Self::default_base_url(),
            request_timeout_ms: None,
        }
    }
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .expect("config builds")
            .try_deserialize()
            .expect("config deserializes")
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let mut config = parse("[server]\nport = 8080\n");
        config.validate().unwrap();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert!(config.auth.uses_default_credentials());
        assert_eq!(config.login.error_reset(), Duration::from_secs(2));
        assert_eq!(config.refiner.model, DEFAULT_GEMINI_MODEL);
        assert!(config.refiner.api_key.is_none());
    }

    #[test]
    fn explicit_sections_override_defaults() {
        let config = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [storage]
            backend = "memory"

            [auth]
            admin_id = "owner"
            admin_secret = "hunter2"
            simulated_latency_ms = 300

            [login]
            error_reset_ms = 500
            "#,
        );
        assert_eq!(config.server.address().port(), 9000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(!config.auth.uses_default_credentials());
        assert_eq!(config.auth.simulated_latency(), Duration::from_millis(300));
        assert_eq!(config.login.error_reset(), Duration::from_millis(500));
    }

    #[test]
    fn refiner_timeout_defaults() {
        assert_eq!(
            RefinerConfig::default().request_timeout(),
            Duration::from_secs(15)
        );
    }

    #[test]
    #[should_panic(expected = "Simulated latency cannot exceed 10 seconds")]
    fn validate_rejects_excessive_latency() {
        let mut config = parse("[server]\nport = 8080\n[auth]\nsimulated_latency_ms = 20000\n");
        let _ = config.validate();
    }

    #[test]
    #[should_panic(expected = "Error reset delay must be positive")]
    fn validate_rejects_zero_error_reset() {
        let mut config = parse("[server]\nport = 8080\n[login]\nerror_reset_ms = 0\n");
        let _ = config.validate();
    }
}

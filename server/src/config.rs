//! Layered configuration (§1, §6.4): bundled defaults, an optional
//! `CONFIG_FILE`, then `ORCH_`-prefixed environment variables, in that
//! order of increasing precedence.

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Root directory for persisted state, workflow checkpoints and logs (§6.3).
    pub data_dir: String,
    pub log_level: String,
    /// Falls back to `<data_dir>/logs` when unset.
    pub log_dir: Option<String>,
    pub http_host: String,
    pub http_port: u16,
    pub cors_origins: Vec<String>,
    pub cmdb_agent_url: Option<String>,
    pub executor: ExecutorSettings,
    pub health_checker: HealthCheckerSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExecutorSettings {
    pub default_timeout_seconds: f64,
    pub retry_base_delay_seconds: f64,
    pub retry_max_delay_seconds: f64,
    pub retry_backoff_factor: f64,
    pub max_history_records: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HealthCheckerSettings {
    pub check_timeout_seconds: f64,
    pub cache_ttl_seconds: f64,
    pub max_history_per_agent: usize,
    pub max_total_history: usize,
}

impl Config {
    /// Loads configuration from the bundled defaults, an optional
    /// `CONFIG_FILE`, and `ORCH_`-prefixed environment variables.
    pub fn from_env() -> Result<Self> {
        let mut builder = ConfigBuilder::builder().add_source(File::from_str(
            include_str!("../config/default.toml"),
            FileFormat::Toml,
        ));

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(
                File::with_name(&config_file)
                    .required(false)
                    .format(FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("ORCH")
                .separator("_")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors_origins"),
        );

        let config = builder.build().context("failed to build configuration")?;
        config
            .try_deserialize()
            .context("failed to deserialize configuration")
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let builder = ConfigBuilder::builder()
            .add_source(File::with_name(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix("ORCH")
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            );

        let config = builder
            .build()
            .context("failed to build configuration from file")?;
        config
            .try_deserialize()
            .context("failed to deserialize configuration from file")
    }

    pub fn log_dir(&self) -> String {
        self.log_dir
            .clone()
            .unwrap_or_else(|| format!("{}/logs", self.data_dir))
    }

    pub fn http_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn validate(&self) -> Result<()> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(anyhow::anyhow!(
                    "invalid log level: {other}. must be one of: trace, debug, info, warn, error"
                ));
            }
        }

        if self.http_port == 0 {
            return Err(anyhow::anyhow!("http_port cannot be 0"));
        }
        if self.cors_origins.is_empty() {
            return Err(anyhow::anyhow!("cors_origins must list at least one origin, or \"*\""));
        }

        let e = &self.executor;
        if e.default_timeout_seconds <= 0.0
            || e.retry_base_delay_seconds <= 0.0
            || e.retry_max_delay_seconds <= 0.0
            || e.retry_backoff_factor <= 0.0
        {
            return Err(anyhow::anyhow!("executor timing settings must be positive"));
        }
        if e.retry_max_delay_seconds < e.retry_base_delay_seconds {
            return Err(anyhow::anyhow!(
                "executor.retry_max_delay_seconds must be >= retry_base_delay_seconds"
            ));
        }

        let h = &self.health_checker;
        if h.check_timeout_seconds <= 0.0 || h.cache_ttl_seconds <= 0.0 {
            return Err(anyhow::anyhow!("health_checker timing settings must be positive"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            log_level: "info".to_string(),
            log_dir: None,
            http_host: "127.0.0.1".to_string(),
            http_port: 8080,
            cors_origins: vec!["*".to_string()],
            cmdb_agent_url: None,
            executor: ExecutorSettings {
                default_timeout_seconds: 30.0,
                retry_base_delay_seconds: 1.0,
                retry_max_delay_seconds: 60.0,
                retry_backoff_factor: 2.0,
                max_history_records: 1_000,
            },
            health_checker: HealthCheckerSettings {
                check_timeout_seconds: 5.0,
                cache_ttl_seconds: 30.0,
                max_history_per_agent: 200,
                max_total_history: 2_000,
            },
        }
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
    fn log_dir_falls_back_to_data_dir() {
        let config = Config::default();
        assert_eq!(config.log_dir(), "./data/logs");
    }

    #[test]
    fn http_address_combines_host_and_port() {
        assert_eq!(Config::default().http_address(), "127.0.0.1:8080");
    }

    #[test]
    fn rejects_invalid_log_level() {
        let mut config = Config::default();
        config.log_level = "verbose".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_http_port() {
        let mut config = Config::default();
        config.http_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_cors_origins() {
        let mut config = Config::default();
        config.cors_origins = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_executor_settings() {
        let mut config = Config::default();
        config.executor.retry_backoff_factor = 0.0;
        assert!(config.validate().is_err());
    }
}

//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml, then applies environment
//! variable overrides and finally command-line flags.

use crate::auth::secure::SecureString;
use crate::cli::Cli;
use crate::graph::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub target: TargetConfig,
    pub api: ApiConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub tenant_id: String,
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: SecureString,
    pub scope: String,
}

/// The group and application a run operates on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub app_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub login_base_url: String,
    pub graph_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Load configuration from embedded config.toml with environment and CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = Self::embedded()?;
        config.apply_env(|key| env::var(key).ok());
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Parse the embedded defaults without any overrides.
    pub fn embedded() -> Result<Self> {
        toml::from_str(CONFIG_TOML).context("Failed to parse embedded config.toml")
    }

    /// Apply environment variable overrides.
    ///
    /// Credentials and target names are read through the CLI layer, which
    /// falls back to the same `AZURE_*` variables. `RUST_LOG` is read by the
    /// log filter itself; `logging.level` is only its fallback.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("GRAPH_BASE_URL") {
            self.api.graph_base_url = url;
        }

        if let Some(url) = lookup("AZURE_LOGIN_BASE_URL") {
            self.api.login_base_url = url;
        }
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(tenant_id) = &cli.tenant_id {
            self.oauth.tenant_id = tenant_id.clone();
        }
        if let Some(client_id) = &cli.client_id {
            self.oauth.client_id = client_id.clone();
        }
        if let Some(secret) = &cli.client_secret {
            self.oauth.client_secret = SecureString::new(secret.clone());
        }
        if let Some(group) = &cli.group_name {
            self.target.group_name = group.clone();
        }
        if let Some(app) = &cli.app_name {
            self.target.app_name = app.clone();
        }
        if let Some(secs) = cli.timeout_secs {
            self.http.timeout_seconds = secs;
        }
        if let Some(attempts) = cli.max_attempts {
            self.retry.max_attempts = attempts;
        }
    }

    /// Validate that required configuration is present.
    fn validate(&self) -> Result<()> {
        let required = [
            ("tenant ID", "AZURE_TENANT_ID", self.oauth.tenant_id.as_str()),
            ("client ID", "AZURE_CLIENT_ID", self.oauth.client_id.as_str()),
            ("client secret", "AZURE_CLIENT_SECRET", self.oauth.client_secret.as_str()),
            ("group name", "AZURE_GROUP_NAME", self.target.group_name.as_str()),
            ("application name", "AZURE_APP_NAME", self.target.app_name.as_str()),
        ];

        for (what, var, value) in required {
            if value.trim().is_empty() || value.starts_with("YOUR_") {
                anyhow::bail!(
                    "{} not configured. Set {} environment variable or pass it on the command line",
                    what,
                    var
                );
            }
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        if self.http.timeout_seconds == 0 {
            anyhow::bail!("http.timeout_seconds must be at least 1");
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }
}

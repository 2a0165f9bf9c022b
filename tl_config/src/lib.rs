//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Handles service, server, and pool settings from env vars and files

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tl_core::{Error, Result, ServiceKind};
use url::Url;
use validator::Validate;

/// Prefix for structured environment variables, e.g. `TIERLAB_DATABASE__POOL_MAX`
const ENV_PREFIX: &str = "TIERLAB";

/// Un-prefixed variables understood by the original deployment manifests
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.name"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("PORT", "server.port"),
    ("SERVICE_VERSION", "service.version"),
    ("JAEGER_ENDPOINT", "tracing.endpoint"),
];

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    pub service: ServiceConfig,
    pub tracing: TracingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
    /// Upper bound on draining in-flight requests after a termination signal
    #[validate(range(min = 1, max = 600))]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Backing store and connection pool configuration with secret redaction
#[derive(Clone, Deserialize, Serialize, Validate)]
pub struct DatabaseConfig {
    /// Full connection URL; when set it replaces the discrete host/port fields
    pub url: Option<String>,
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub user: String,
    pub password: String,
    #[validate(range(min = 1, max = 1000))]
    pub pool_max: u32,
    #[validate(range(max = 1000))]
    pub pool_min: u32,
    pub idle_timeout_ms: u64,
    #[validate(range(min = 1))]
    pub acquire_timeout_ms: u64,
    #[validate(range(min = 1))]
    pub create_timeout_ms: u64,
    #[validate(range(min = 1))]
    pub destroy_timeout_ms: u64,
    pub retry_interval_ms: u64,
    #[validate(range(min = 1, max = 1000))]
    pub max_attempts: u32,
    #[validate(range(min = 1))]
    pub health_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "postgresql".to_string(),
            port: 5432,
            name: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            pool_max: 15,
            pool_min: 2,
            idle_timeout_ms: 30_000,
            acquire_timeout_ms: 60_000,
            create_timeout_ms: 30_000,
            destroy_timeout_ms: 5_000,
            retry_interval_ms: 2_000,
            max_attempts: 30,
            health_timeout_ms: 3_000,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL for the pool; falls back to a Postgres URL built from
    /// the discrete fields
    /// `database.url` when set, otherwise a Postgres URL built from the
    /// discrete fields with user, password and database name percent-encoded
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = self.url.as_deref().filter(|url| !url.is_empty()) {
            return Ok(url.to_string());
        }

        let mut url = Url::parse(&format!("postgres://{}:{}", self.host, self.port))
            .map_err(|e| Error::Config(format!("Invalid database host {}: {}", self.host, e)))?;
        url.set_path(&format!("/{}", self.name));
        url.set_username(&self.user)
            .and_then(|_| url.set_password(Some(&self.password)))
            .map_err(|_| Error::Config("Database URL cannot carry credentials".to_string()))?;

        Ok(url.into())
    }

    /// Connection URL safe for logs
    pub fn redacted_url(&self) -> String {
        match &self.url {
            Some(url) if !url.is_empty() => match url.split_once('@') {
                Some((_, rest)) => format!("[REDACTED]@{}", rest),
                None => url.clone(),
            },
            _ => format!(
                "postgres://{}:[REDACTED]@{}:{}/{}",
                self.user, self.host, self.port, self.name
            ),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    pub fn destroy_timeout(&self) -> Duration {
        Duration::from_millis(self.destroy_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| self.redacted_url()))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("pool_max", &self.pool_max)
            .field("pool_min", &self.pool_min)
            .field("idle_timeout_ms", &self.idle_timeout_ms)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .field("create_timeout_ms", &self.create_timeout_ms)
            .field("destroy_timeout_ms", &self.destroy_timeout_ms)
            .field("retry_interval_ms", &self.retry_interval_ms)
            .field("max_attempts", &self.max_attempts)
            .field("health_timeout_ms", &self.health_timeout_ms)
            .finish()
    }
}

/// Identity and runtime environment of this replica
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServiceConfig {
    #[validate(length(min = 1))]
    pub version: String,
    /// Explicit replica name; resolved from the host when unset
    pub pod_name: Option<String>,
    /// `production` switches logs to JSON
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: "v1.0.0".to_string(),
            pod_name: None,
            environment: "development".to_string(),
        }
    }
}

/// External trace collector
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TracingConfig {
    pub endpoint: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            endpoint: "jaeger".to_string(),
        }
    }
}

impl Config {
    /// Built-in defaults for the given service, before any source is applied
    pub fn defaults_for(kind: ServiceKind) -> Self {
        Self {
            server: ServerConfig {
                port: kind.default_port(),
                ..ServerConfig::default()
            },
            database: DatabaseConfig::default(),
            service: ServiceConfig::default(),
            tracing: TracingConfig::default(),
        }
    }

    /// Load configuration: defaults, then an optional `tierlab.{toml,yaml,json}`
    /// file, then legacy variables, then `TIERLAB_*` variables (highest priority)
    pub fn load(kind: ServiceKind) -> Result<Self> {
        let defaults = Self::defaults_for(kind);
        let db = &defaults.database;

        let mut builder = ConfigBuilder::builder()
            .set_default("server.host", defaults.server.host.clone())?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default(
                "server.shutdown_timeout_secs",
                defaults.server.shutdown_timeout_secs as i64,
            )?
            .set_default("database.host", db.host.clone())?
            .set_default("database.port", db.port as i64)?
            .set_default("database.name", db.name.clone())?
            .set_default("database.user", db.user.clone())?
            .set_default("database.password", db.password.clone())?
            .set_default("database.pool_max", db.pool_max as i64)?
            .set_default("database.pool_min", db.pool_min as i64)?
            .set_default("database.idle_timeout_ms", db.idle_timeout_ms as i64)?
            .set_default("database.acquire_timeout_ms", db.acquire_timeout_ms as i64)?
            .set_default("database.create_timeout_ms", db.create_timeout_ms as i64)?
            .set_default("database.destroy_timeout_ms", db.destroy_timeout_ms as i64)?
            .set_default("database.retry_interval_ms", db.retry_interval_ms as i64)?
            .set_default("database.max_attempts", db.max_attempts as i64)?
            .set_default("database.health_timeout_ms", db.health_timeout_ms as i64)?
            .set_default("service.version", defaults.service.version.clone())?
            .set_default("service.environment", defaults.service.environment.clone())?
            .set_default("tracing.endpoint", defaults.tracing.endpoint.clone())?;

        builder = builder.add_source(File::with_name("tierlab").required(false));

        // Legacy variables apply unless the structured variable is also present
        for (legacy, key) in LEGACY_ENV_KEYS {
            if std::env::var(structured_env_name(key)).is_ok() {
                continue;
            }
            if let Ok(value) = std::env::var(legacy) {
                builder = builder.set_override(*key, value)?;
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        parsed.check()?;
        Ok(parsed)
    }

    /// Field validation plus cross-field invariants
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::Config(format!("Config validation failed: {}", e)))?;

        self.database.connection_url()?;

        if self.database.pool_min > self.database.pool_max {
            return Err(Error::Config(format!(
                "Config validation failed: database.pool_min ({}) exceeds database.pool_max ({})",
                self.database.pool_min, self.database.pool_max
            )));
        }

        Ok(())
    }
}

/// `database.pool_max` -> `TIERLAB_DATABASE__POOL_MAX`
fn structured_env_name(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key.replace('.', "__").to_uppercase())
}

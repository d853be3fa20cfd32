use crate::domain::dataset::DEFAULT_RETENTION;
use crate::domain::error::{AppError, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "equipviz.toml";
pub const ENV_PREFIX: &str = "EQUIPVIZ_";

/// Records rendered into a PDF report before truncating
pub const DEFAULT_REPORT_MAX_RECORDS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub retention: RetentionConfig,
    pub report: ReportConfig,
    /// `tracing_subscriber` filter directive; `RUST_LOG` takes precedence
    pub log_filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Datasets kept per owner
    pub keep: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub max_records: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                path: PathBuf::from("data").join("equipviz.db"),
                max_connections: 4,
            },
            retention: RetentionConfig {
                keep: DEFAULT_RETENTION,
            },
            report: ReportConfig {
                max_records: DEFAULT_REPORT_MAX_RECORDS,
            },
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `equipviz.toml`, then `EQUIPVIZ_*` variables
    /// (`EQUIPVIZ_SERVER__PORT=9000`). A `.env` file is loaded first.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::Internal(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retention.keep < 1 {
            return Err(AppError::ValidationError(
                "retention.keep must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(AppError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

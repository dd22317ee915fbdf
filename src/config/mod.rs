#[cfg(feature = "cli")]
pub mod cli;
pub mod settings;
pub mod toml_config;

use crate::core::geo_engine::GeoConfig;
use crate::core::ml_engine::MlConfig;
use crate::utils::error::{Result, ServiceError};
use crate::utils::validation::{
    validate_host, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_required_field, validate_sql_identifier, Validate,
};
use settings::Settings;
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_API_TITLE: &str = "Lead Intelligence API";
pub const DEFAULT_API_VERSION: &str = "2.0.0";
pub const DEFAULT_LEADS_TABLE: &str = "leads";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: DEFAULT_API_TITLE.to_string(),
            version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct DatabaseConfig {
    pub server: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub leads_table: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

// 密碼不寫入日誌
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("server", &self.server)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"***")
            .field("leads_table", &self.leads_table)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_seconds", &self.acquire_timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeadSourceConfig {
    Postgres(DatabaseConfig),
    Csv { path: String },
}

impl LeadSourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Csv { .. } => "csv",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub analysis_cache_ttl_seconds: u64,
}

/// Fully resolved service configuration.
///
/// Precedence, lowest to highest: built-in defaults, TOML file, environment,
/// command line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub api: ApiInfo,
    pub source: LeadSourceConfig,
    pub max_leads: Option<usize>,
    pub ml: MlConfig,
    pub geo: GeoConfig,
    pub monitoring: MonitoringConfig,
}

impl ServiceConfig {
    /// 讀取選用的 TOML 檔並與環境變數合併
    pub fn load(config_path: Option<&str>, settings: Settings) -> Result<Self> {
        let file = match config_path {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };
        Self::resolve(settings, file)
    }

    pub fn resolve(settings: Settings, file: TomlConfig) -> Result<Self> {
        let source = Self::resolve_source(&settings, &file)?;
        let monitoring_enabled = file.monitoring_enabled();

        Ok(Self {
            server: ServerConfig {
                host: settings
                    .server_host
                    .or(file.server.host)
                    .unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: settings.server_port.or(file.server.port).unwrap_or(DEFAULT_PORT),
                request_timeout_seconds: file
                    .server
                    .request_timeout_seconds
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            },
            api: ApiInfo {
                title: settings
                    .api_title
                    .or(file.api.title)
                    .unwrap_or_else(|| DEFAULT_API_TITLE.to_string()),
                version: settings
                    .api_version
                    .or(file.api.version)
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            },
            source,
            max_leads: file.source.max_leads,
            ml: file.ml,
            geo: file.geo,
            monitoring: MonitoringConfig {
                enabled: monitoring_enabled,
                analysis_cache_ttl_seconds: file.monitoring.analysis_cache_ttl_seconds.unwrap_or(0),
            },
        })
    }

    fn resolve_source(settings: &Settings, file: &TomlConfig) -> Result<LeadSourceConfig> {
        if let Some(path) = &settings.leads_csv {
            return Ok(LeadSourceConfig::Csv { path: path.clone() });
        }

        match file.source.r#type.as_deref().unwrap_or("postgres") {
            "postgres" | "postgresql" => {
                let db = &file.database;
                let server = settings.database_server.clone().or_else(|| db.server.clone());
                let name = settings.database_name.clone().or_else(|| db.name.clone());
                let username = settings.database_username.clone().or_else(|| db.username.clone());
                let password = settings.database_password.clone().or_else(|| db.password.clone());

                Ok(LeadSourceConfig::Postgres(DatabaseConfig {
                    server: validate_required_field("DATABASE_SERVER", &server)?.clone(),
                    name: validate_required_field("DATABASE_NAME", &name)?.clone(),
                    username: validate_required_field("DATABASE_USERNAME", &username)?.clone(),
                    password: validate_required_field("DATABASE_PASSWORD", &password)?.clone(),
                    leads_table: db
                        .leads_table
                        .clone()
                        .unwrap_or_else(|| DEFAULT_LEADS_TABLE.to_string()),
                    max_connections: db.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
                    acquire_timeout_seconds: db
                        .acquire_timeout_seconds
                        .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECONDS),
                }))
            }
            "csv" => {
                let path = validate_required_field("source.path", &file.source.path)?;
                Ok(LeadSourceConfig::Csv { path: path.clone() })
            }
            other => Err(ServiceError::InvalidConfigValueError {
                field: "source.type".to_string(),
                value: other.to_string(),
                reason: "Supported sources: postgres, csv".to_string(),
            }),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.monitoring.analysis_cache_ttl_seconds)
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        validate_host("server.host", &self.server.host)?;
        validate_range(
            "server.request_timeout_seconds",
            self.server.request_timeout_seconds,
            1,
            3600,
        )?;
        validate_non_empty_string("api.title", &self.api.title)?;
        validate_non_empty_string("api.version", &self.api.version)?;

        match &self.source {
            LeadSourceConfig::Postgres(db) => {
                validate_non_empty_string("DATABASE_NAME", &db.name)?;
                validate_non_empty_string("DATABASE_USERNAME", &db.username)?;
                validate_sql_identifier("database.leads_table", &db.leads_table)?;
                validate_range("database.max_connections", db.max_connections, 1, 100)?;
                validate_range(
                    "database.acquire_timeout_seconds",
                    db.acquire_timeout_seconds,
                    1,
                    300,
                )?;
            }
            LeadSourceConfig::Csv { path } => validate_path("source.path", path)?,
        }

        if let Some(max) = self.max_leads {
            validate_positive_number("source.max_leads", max, 1)?;
        }

        tracing::debug!("✅ Service configuration validation passed");
        Ok(())
    }
}

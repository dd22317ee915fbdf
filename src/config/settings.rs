use crate::utils::error::{Result, ServiceError};
use std::path::Path;

/// 載入工作目錄 (或上層) 的 `.env`；檔案不存在不算錯誤
pub fn load_dotenv() -> Result<bool> {
    dotenv_outcome(dotenvy::dotenv().map(|_| ()))
}

/// Loads a specific `.env` file. `Ok(false)` when it does not exist.
pub fn load_dotenv_from(path: &Path) -> Result<bool> {
    dotenv_outcome(dotenvy::from_path(path))
}

fn dotenv_outcome(result: std::result::Result<(), dotenvy::Error>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(ServiceError::ConfigError {
            message: format!("cannot read .env file: {}", e),
        }),
    }
}

/// 由環境變數 (含 .env) 讀取的設定
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub database_server: Option<String>,
    pub database_name: Option<String>,
    pub database_username: Option<String>,
    pub database_password: Option<String>,
    pub api_title: Option<String>,
    pub api_version: Option<String>,
    pub leads_csv: Option<String>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_port = match get("SERVER_PORT") {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|e| {
                ServiceError::InvalidConfigValueError {
                    field: "SERVER_PORT".to_string(),
                    value: raw.clone(),
                    reason: format!("not a valid port: {}", e),
                }
            })?),
            None => None,
        };

        Ok(Self {
            database_server: get("DATABASE_SERVER"),
            database_name: get("DATABASE_NAME"),
            database_username: get("DATABASE_USERNAME"),
            database_password: get("DATABASE_PASSWORD"),
            api_title: get("API_TITLE"),
            api_version: get("API_VERSION"),
            leads_csv: get("LEADS_CSV"),
            server_host: get("SERVER_HOST"),
            server_port,
        })
    }
}

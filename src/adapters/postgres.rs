use crate::config::DatabaseConfig;
use crate::domain::model::Lead;
use crate::domain::ports::LeadRepository;
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5432;

#[derive(FromRow, Debug)]
struct LeadRow {
    id: i64,
    name: String,
    email: Option<String>,
    company: Option<String>,
    country: Option<String>,
    source: Option<String>,
    status: Option<String>,
    deal_value: Option<f64>,
    interactions: Option<i32>,
    created_at: DateTime<Utc>,
    last_activity_at: Option<DateTime<Utc>>,
    converted: bool,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            company: row.company,
            country: row.country,
            source: row.source,
            status: row.status,
            deal_value: row.deal_value.unwrap_or(0.0),
            interactions: row.interactions.unwrap_or(0),
            created_at: row.created_at,
            last_activity_at: row.last_activity_at,
            converted: row.converted,
        }
    }
}

/// Splits `DATABASE_SERVER` into host and port. Accepts `host`, `host:port`,
/// bracketed IPv6 (`[::1]`, `[::1]:5432`) and the `host,port` form used by
/// SQL Server style connection settings.
pub fn parse_server(server: &str) -> Result<(String, u16)> {
    let server = server.trim();
    let invalid = |reason: String| ServiceError::InvalidConfigValueError {
        field: "DATABASE_SERVER".to_string(),
        value: server.to_string(),
        reason,
    };

    let (host, port) = if let Some(rest) = server.strip_prefix('[') {
        match rest.split_once(']') {
            Some((host, "")) => (host, None),
            Some((host, tail)) => match tail.strip_prefix(':').or_else(|| tail.strip_prefix(',')) {
                Some(port) => (host, Some(port)),
                None => return Err(invalid(format!("unexpected text after ']': {}", tail))),
            },
            None => return Err(invalid("missing closing ']'".to_string())),
        }
    } else if let Some((host, port)) = server.rsplit_once(',') {
        (host, Some(port))
    } else {
        match server.rsplit_once(':') {
            // 未加括號的 IPv6 位址視為純主機
            Some((host, _)) if host.contains(':') => (server, None),
            Some((host, port)) => (host, Some(port)),
            None => (server, None),
        }
    };

    let port = match port {
        Some(port) => port
            .trim()
            .parse::<u16>()
            .map_err(|e| invalid(format!("invalid port: {}", e)))?,
        None => DEFAULT_PORT,
    };

    let host = host.trim();
    if host.is_empty() {
        return Err(invalid("host cannot be empty".to_string()));
    }

    Ok((host.to_string(), port))
}

fn select_active_leads(table: &str) -> String {
    format!(
        r#"
        SELECT
            id, name, email, company, country, source, status,
            deal_value, interactions, created_at, last_activity_at,
            COALESCE(converted, FALSE) AS converted
        FROM {}
        WHERE COALESCE(is_active, TRUE)
        ORDER BY id
        "#,
        table
    )
}

pub struct PostgresLeadRepository {
    pool: PgPool,
    query: String,
    description: String,
}

impl PostgresLeadRepository {
    /// 建立連線池並立即連線，連不上時直接回傳錯誤
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let (host, port) = parse_server(&config.server)?;

        let options = PgConnectOptions::new()
            .host(&host)
            .port(port)
            .database(&config.name)
            .username(&config.username)
            .password(&config.password);

        tracing::info!(
            "🔌 Connecting to PostgreSQL at {}:{} (database '{}', pool size {})",
            host,
            port,
            config.name,
            config.max_connections
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        Ok(Self::from_pool(pool, &config.leads_table, format!("postgres:{}:{}/{}", host, port, config.name)))
    }

    pub fn from_pool(pool: PgPool, table: &str, description: String) -> Self {
        Self {
            pool,
            query: select_active_leads(table),
            description,
        }
    }
}

#[async_trait]
impl LeadRepository for PostgresLeadRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_active_leads(&self) -> Result<Vec<Lead>> {
        let rows = sqlx::query_as::<_, LeadRow>(&self.query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Lead::from).collect())
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

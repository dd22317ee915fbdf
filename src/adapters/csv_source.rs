use crate::domain::model::Lead;
use crate::domain::ports::LeadRepository;
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

const REQUIRED_HEADERS: [&str; 3] = ["id", "name", "created_at"];

/// One CSV row; optional columns may be missing or empty.
#[derive(Debug, Deserialize)]
struct LeadCsvRecord {
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
    converted: Option<bool>,
    is_active: Option<bool>,
}

impl From<LeadCsvRecord> for Lead {
    fn from(record: LeadCsvRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            company: record.company,
            country: record.country,
            source: record.source,
            status: record.status,
            deal_value: record.deal_value.unwrap_or(0.0),
            interactions: record.interactions.unwrap_or(0),
            created_at: record.created_at,
            last_activity_at: record.last_activity_at,
            converted: record.converted.unwrap_or(false),
        }
    }
}

/// 從 CSV 檔案讀取潛在客戶，每次分析都重新讀檔
#[derive(Debug, Clone)]
pub struct CsvLeadRepository {
    path: PathBuf,
}

impl CsvLeadRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| ServiceError::RepositoryUnavailable {
                message: format!("cannot read {}: {}", self.path.display(), e),
            })
    }

    fn check_headers(headers: &csv::StringRecord) -> Result<()> {
        for required in REQUIRED_HEADERS {
            if !headers.iter().any(|h| h.trim() == required) {
                return Err(ServiceError::ValidationError {
                    message: format!("leads CSV is missing the '{}' column", required),
                });
            }
        }
        Ok(())
    }

    pub fn parse(data: &[u8]) -> Result<Vec<Lead>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data);
        Self::check_headers(reader.headers()?)?;

        let mut leads = Vec::new();
        for row in reader.deserialize::<LeadCsvRecord>() {
            let record = row?;
            if record.is_active.unwrap_or(true) {
                leads.push(Lead::from(record));
            }
        }
        leads.sort_by_key(|l| l.id);
        Ok(leads)
    }
}

#[async_trait]
impl LeadRepository for CsvLeadRepository {
    async fn ping(&self) -> Result<()> {
        let data = self.read().await?;
        let mut reader = csv::Reader::from_reader(data.as_slice());
        Self::check_headers(reader.headers()?)
    }

    async fn fetch_active_leads(&self) -> Result<Vec<Lead>> {
        let data = self.read().await?;
        Self::parse(&data)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

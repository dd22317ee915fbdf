// Adapters layer: concrete lead repositories (PostgreSQL, CSV, in-memory).

pub mod csv_source;
pub mod memory;
pub mod postgres;

use crate::config::LeadSourceConfig;
use crate::domain::ports::LeadRepository;
use crate::utils::error::Result;
use std::sync::Arc;

pub use csv_source::CsvLeadRepository;
pub use memory::InMemoryLeadRepository;
pub use postgres::PostgresLeadRepository;

/// 依設定建立資料來源
pub async fn build_repository(source: &LeadSourceConfig) -> Result<Arc<dyn LeadRepository>> {
    match source {
        LeadSourceConfig::Postgres(database) => {
            let repository = PostgresLeadRepository::connect(database).await?;
            Ok(Arc::new(repository))
        }
        LeadSourceConfig::Csv { path } => {
            tracing::info!("📄 Using CSV lead source: {}", path);
            Ok(Arc::new(CsvLeadRepository::new(path)))
        }
    }
}

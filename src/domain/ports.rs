use crate::domain::model::Lead;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 潛在客戶資料來源 (資料庫、CSV、記憶體)
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Cheap connectivity check used at startup and by `/health`.
    async fn ping(&self) -> Result<()>;

    /// All active leads, ordered by id.
    async fn fetch_active_leads(&self) -> Result<Vec<Lead>>;

    fn describe(&self) -> String;
}

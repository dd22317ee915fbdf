use crate::domain::model::Lead;
use crate::domain::ports::LeadRepository;
use crate::utils::error::{Result, ServiceError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed lead snapshot held in memory; used by tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryLeadRepository {
    leads: Vec<Lead>,
    unavailable: Option<String>,
    fetches: AtomicUsize,
}

impl InMemoryLeadRepository {
    pub fn new(mut leads: Vec<Lead>) -> Self {
        leads.sort_by_key(|l| l.id);
        Self {
            leads,
            unavailable: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// A repository whose every call fails, simulating a database outage.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            leads: Vec::new(),
            unavailable: Some(message.into()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        match &self.unavailable {
            Some(message) => Err(ServiceError::RepositoryUnavailable {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    async fn fetch_active_leads(&self) -> Result<Vec<Lead>> {
        self.check_available()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.leads.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} leads)", self.leads.len())
    }
}

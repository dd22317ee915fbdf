use crate::core::cache::AnalysisCache;
use crate::core::geo_engine::GeoEngine;
use crate::core::ml_engine::MlEngine;
use crate::domain::model::{GeoAnalysis, Lead, MlAnalysis};
use crate::domain::ports::LeadRepository;
use crate::utils::error::{Result, ServiceError};
use crate::utils::monitor::ProcessMonitor;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct IntelligenceOptions {
    pub max_leads: Option<usize>,
    pub cache_ttl: Duration,
    pub monitor: bool,
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub database_connected: bool,
    pub error: Option<String>,
}

/// Shared by every request handler: repository plus both engines, loaded once.
pub struct LeadIntelligence {
    repository: Arc<dyn LeadRepository>,
    ml_engine: Arc<MlEngine>,
    geo_engine: Arc<GeoEngine>,
    ml_cache: AnalysisCache<MlAnalysis>,
    geo_cache: AnalysisCache<GeoAnalysis>,
    max_leads: Option<usize>,
    monitor: ProcessMonitor,
}

impl LeadIntelligence {
    pub fn new(
        repository: Arc<dyn LeadRepository>,
        ml_engine: MlEngine,
        geo_engine: GeoEngine,
        options: IntelligenceOptions,
    ) -> Self {
        if !options.cache_ttl.is_zero() {
            tracing::info!("🗄️ Analysis cache enabled (TTL {:?})", options.cache_ttl);
        }

        Self {
            repository,
            ml_engine: Arc::new(ml_engine),
            geo_engine: Arc::new(geo_engine),
            ml_cache: AnalysisCache::new(options.cache_ttl),
            geo_cache: AnalysisCache::new(options.cache_ttl),
            max_leads: options.max_leads,
            monitor: ProcessMonitor::new(options.monitor),
        }
    }

    async fn load_leads(&self) -> Result<Vec<Lead>> {
        let mut leads = self.repository.fetch_active_leads().await?;

        if let Some(max) = self.max_leads {
            if leads.len() > max {
                tracing::warn!("Lead snapshot truncated from {} to {} records", leads.len(), max);
                leads.truncate(max);
            }
        }

        tracing::debug!("Loaded {} active leads from {}", leads.len(), self.repository.describe());
        Ok(leads)
    }

    /// 執行全部 ML 模型 (lead scoring / churn / segmentation / recommendations)
    pub async fn ml_analysis(&self) -> Result<Arc<MlAnalysis>> {
        self.ml_cache
            .get_or_try_compute(|| async {
                let started = Instant::now();
                let leads = self.load_leads().await?;
                let engine = Arc::clone(&self.ml_engine);

                // 模型計算屬 CPU 密集，移出 async worker
                let analysis =
                    tokio::task::spawn_blocking(move || engine.run_all_models(&leads, Utc::now()))
                        .await
                        .map_err(|e| ServiceError::AnalysisError {
                            message: format!("ML analysis task failed: {}", e),
                        })?;

                tracing::info!(
                    "✅ ML analysis completed: {} leads in {:?}",
                    analysis.summary.total_leads,
                    started.elapsed()
                );
                self.monitor.log_stats("ML analysis");
                Ok(analysis)
            })
            .await
    }

    /// 執行完整地理市場分析
    pub async fn geo_analysis(&self) -> Result<Arc<GeoAnalysis>> {
        self.geo_cache
            .get_or_try_compute(|| async {
                let started = Instant::now();
                let leads = self.load_leads().await?;
                let engine = Arc::clone(&self.geo_engine);

                let analysis = tokio::task::spawn_blocking(move || {
                    engine.run_complete_analysis(&leads, Utc::now())
                })
                .await
                .map_err(|e| ServiceError::AnalysisError {
                    message: format!("Geographical analysis task failed: {}", e),
                })?;

                tracing::info!(
                    "✅ Geographical analysis completed: {} countries in {:?}",
                    analysis.summary.total_countries,
                    started.elapsed()
                );
                self.monitor.log_stats("Geo analysis");
                Ok(analysis)
            })
            .await
    }

    pub async fn health(&self) -> HealthReport {
        match self.repository.ping().await {
            Ok(()) => HealthReport {
                database_connected: true,
                error: None,
            },
            Err(e) => {
                tracing::error!("Health check failed: {}", e);
                HealthReport {
                    database_connected: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

use crate::adapters::build_repository;
use crate::app::{docs, response, routes};
use crate::config::{ApiInfo, ServiceConfig};
use crate::core::geo_engine::GeoEngine;
use crate::core::intelligence::{IntelligenceOptions, LeadIntelligence};
use crate::core::ml_engine::MlEngine;
use crate::domain::ports::LeadRepository;
use crate::utils::error::{Result, ServiceError};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<ApiInfo>,
    pub intelligence: Arc<LeadIntelligence>,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let docs: Router<AppState> = docs::docs_router(&state.api);

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/api/v1/score-all-leads", post(routes::score_all_leads))
        .route("/api/v1/summary", get(routes::summary))
        .route("/api/v1/top-leads/{limit}", get(routes::top_leads))
        .route("/api/v1/at-risk-leads", get(routes::at_risk_leads))
        .route("/api/v1/recommendations", get(routes::recommendations))
        .route(
            "/api/v1/geographical-analysis",
            post(routes::geographical_analysis),
        )
        .route("/api/v1/countries", get(routes::countries))
        .route(
            "/api/v1/market-recommendations",
            get(routes::market_recommendations),
        )
        .merge(docs)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        // 逾時 / 404 / 405 也回傳 {"detail": ...}
        .layer(middleware::map_response(response::json_error_bodies))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// A bound, fully initialised service. Construction fails fast: the
/// repository must answer and both engines must load before the port opens.
pub struct Application {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl Application {
    pub async fn build(config: &ServiceConfig) -> Result<Self> {
        tracing::info!("🚀 Starting {} v{}", config.api.title, config.api.version);
        tracing::info!("📦 Lead source: {}", config.source.kind());

        let repository = build_repository(&config.source).await?;
        Self::with_repository(config, repository).await
    }

    pub async fn with_repository(
        config: &ServiceConfig,
        repository: Arc<dyn LeadRepository>,
    ) -> Result<Self> {
        // 啟動前先確認資料來源可用
        repository
            .ping()
            .await
            .map_err(|e| ServiceError::RepositoryUnavailable {
                message: format!("{} is not reachable: {}", repository.describe(), e),
            })?;
        tracing::info!("✅ Lead repository ready: {}", repository.describe());

        let ml_engine = MlEngine::new(config.ml.clone())?;
        let geo_engine = GeoEngine::new(config.geo.clone())?;
        tracing::info!("🧠 ML engine and geographical engine loaded");

        let intelligence = LeadIntelligence::new(
            repository,
            ml_engine,
            geo_engine,
            IntelligenceOptions {
                max_leads: config.max_leads,
                cache_ttl: config.cache_ttl(),
                monitor: config.monitoring.enabled,
            },
        );

        let state = AppState {
            api: Arc::new(config.api.clone()),
            intelligence: Arc::new(intelligence),
        };

        let listener = TcpListener::bind(config.server.bind_address()).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("🌐 Listening on http://{}", local_addr);

        Ok(Self {
            listener,
            router: router(state, config.server.request_timeout()),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("👋 Server stopped");
        Ok(())
    }

    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("🛑 Ctrl-C received, shutting down"),
        _ = terminate => tracing::info!("🛑 SIGTERM received, shutting down"),
    }
}

use crate::app::docs::DOCS_PATH;
use crate::app::response::{
    ApiError, AtRiskLeadsResponse, CountriesResponse, ErrorBody, HealthStatus,
    MarketRecommendationsResponse, RecommendationsResponse, ServiceFeatures, ServiceInfo,
    SummaryResponse, TopLeadsResponse, SUCCESS,
};
use crate::app::server::AppState;
use crate::core::ml_engine::MAX_TOP_LEADS;
use crate::domain::model::{GeoAnalysis, MlAnalysis};
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use std::num::IntErrorKind;
use std::sync::Arc;

const ENDPOINTS: [(&str, &str); 9] = [
    ("ml_complete", "POST /api/v1/score-all-leads"),
    ("ml_summary", "GET /api/v1/summary"),
    ("ml_top_leads", "GET /api/v1/top-leads/{limit}"),
    ("ml_at_risk", "GET /api/v1/at-risk-leads"),
    ("ml_recommendations", "GET /api/v1/recommendations"),
    ("geo_complete", "POST /api/v1/geographical-analysis"),
    ("geo_countries", "GET /api/v1/countries"),
    ("geo_recommendations", "GET /api/v1/market-recommendations"),
    ("health", "GET /health"),
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Root & health
// ---------------------------------------------------------------------------

/// API information
#[utoipa::path(
    get,
    path = "/",
    tag = "Root",
    responses((status = 200, description = "Service information", body = ServiceInfo))
)]
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: state.api.title.clone(),
        version: state.api.version.clone(),
        status: "active".to_string(),
        description:
            "Complete Lead Intelligence Platform with ML Models & Geographical Analysis".to_string(),
        documentation: DOCS_PATH.to_string(),
        features: ServiceFeatures {
            ml_models: strings(&[
                "Lead Scoring",
                "Churn Risk Prediction",
                "Lead Segmentation",
                "Smart Recommendations",
            ]),
            geographical_analysis: strings(&[
                "Country Performance",
                "Regional Analysis",
                "Market Recommendations",
                "Market Concentration",
            ]),
        },
        endpoints: ENDPOINTS
            .iter()
            .map(|(name, route)| (name.to_string(), route.to_string()))
            .collect(),
    })
}

/// Verify API and database connectivity. Always answers 200; the body says
/// whether the lead repository is reachable.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Health report", body = HealthStatus))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let report = state.intelligence.health().await;
    let timestamp = Utc::now();

    let status = if report.database_connected {
        HealthStatus {
            status: "healthy".to_string(),
            timestamp,
            database: "connected".to_string(),
            ml_engine: "operational".to_string(),
            geo_engine: "operational".to_string(),
            error: None,
        }
    } else {
        HealthStatus {
            status: "unhealthy".to_string(),
            timestamp,
            database: "disconnected".to_string(),
            ml_engine: "unavailable".to_string(),
            geo_engine: "unavailable".to_string(),
            error: report.error,
        }
    };

    Json(status)
}

// ---------------------------------------------------------------------------
// ML models
// ---------------------------------------------------------------------------

async fn ml_analysis(state: &AppState, context: &str) -> Result<Arc<MlAnalysis>, ApiError> {
    state
        .intelligence
        .ml_analysis()
        .await
        .map_err(|e| ApiError::logged(context, e))
}

/// Score all active leads: lead scoring, churn risk, segmentation and recommendations
#[utoipa::path(
    post,
    path = "/api/v1/score-all-leads",
    tag = "ML Models",
    responses(
        (status = 200, description = "Complete ML analysis", body = MlAnalysis),
        (status = 500, description = "Analysis failed", body = ErrorBody)
    )
)]
pub async fn score_all_leads(
    State(state): State<AppState>,
) -> Result<Json<Arc<MlAnalysis>>, ApiError> {
    tracing::info!("Running complete ML analysis on all leads...");
    Ok(Json(ml_analysis(&state, "ML analysis").await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/summary",
    tag = "ML Models",
    responses(
        (status = 200, description = "Lead summary", body = SummaryResponse),
        (status = 500, description = "Analysis failed", body = ErrorBody)
    )
)]
pub async fn summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiError> {
    let analysis = ml_analysis(&state, "Summary generation").await?;
    Ok(Json(SummaryResponse {
        summary: analysis.summary.clone(),
        timestamp: analysis.timestamp,
        status: SUCCESS.to_string(),
    }))
}

/// 解析 top-leads 的 limit，限制在 0..=MAX_TOP_LEADS
pub fn parse_limit(raw: &str) -> Result<usize, ApiError> {
    let limit = raw.trim().parse::<usize>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => {
            ApiError::bad_request(format!("Limit cannot exceed {}", MAX_TOP_LEADS))
        }
        _ => ApiError::bad_request(format!(
            "Invalid limit '{}': expected a whole number between 0 and {}",
            raw, MAX_TOP_LEADS
        )),
    })?;

    if limit > MAX_TOP_LEADS {
        return Err(ApiError::bad_request(format!(
            "Limit cannot exceed {}",
            MAX_TOP_LEADS
        )));
    }
    Ok(limit)
}

/// Highest-scoring non-converted leads
#[utoipa::path(
    get,
    path = "/api/v1/top-leads/{limit}",
    tag = "ML Models",
    params(("limit" = usize, Path, description = "Number of leads to return (0 to 100)")),
    responses(
        (status = 200, description = "Top leads by score", body = TopLeadsResponse),
        (status = 400, description = "Invalid limit", body = ErrorBody),
        (status = 500, description = "Analysis failed", body = ErrorBody)
    )
)]
pub async fn top_leads(
    State(state): State<AppState>,
    Path(raw_limit): Path<String>,
) -> Result<Json<TopLeadsResponse>, ApiError> {
    let limit = parse_limit(&raw_limit)?;

    let analysis = ml_analysis(&state, "Top leads retrieval").await?;
    let top: Vec<_> = analysis.top_leads.iter().take(limit).cloned().collect();

    Ok(Json(TopLeadsResponse {
        count: top.len(),
        top_leads: top,
        timestamp: analysis.timestamp,
        status: SUCCESS.to_string(),
    }))
}

/// Leads with high churn risk
#[utoipa::path(
    get,
    path = "/api/v1/at-risk-leads",
    tag = "ML Models",
    responses(
        (status = 200, description = "High churn-risk leads", body = AtRiskLeadsResponse),
        (status = 500, description = "Analysis failed", body = ErrorBody)
    )
)]
pub async fn at_risk_leads(
    State(state): State<AppState>,
) -> Result<Json<AtRiskLeadsResponse>, ApiError> {
    let analysis = ml_analysis(&state, "At-risk leads retrieval").await?;
    Ok(Json(AtRiskLeadsResponse {
        at_risk_leads: analysis.at_risk_leads.clone(),
        count: analysis.at_risk_leads.len(),
        timestamp: analysis.timestamp,
        status: SUCCESS.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/recommendations",
    tag = "ML Models",
    responses(
        (status = 200, description = "Next best action per lead", body = RecommendationsResponse),
        (status = 500, description = "Analysis failed", body = ErrorBody)
    )
)]
pub async fn recommendations(
    State(state): State<AppState>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let analysis = ml_analysis(&state, "Recommendations generation").await?;
    Ok(Json(RecommendationsResponse {
        recommendations: analysis.recommendations.clone(),
        count: analysis.recommendations.len(),
        timestamp: analysis.timestamp,
        status: SUCCESS.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Geographical analysis
// ---------------------------------------------------------------------------

async fn geo_analysis(state: &AppState, context: &str) -> Result<Arc<GeoAnalysis>, ApiError> {
    state
        .intelligence
        .geo_analysis()
        .await
        .map_err(|e| ApiError::logged(context, e))
}

/// Country performance, regional analysis, market concentration and recommendations
#[utoipa::path(
    post,
    path = "/api/v1/geographical-analysis",
    tag = "Geographical Analysis",
    responses(
        (status = 200, description = "Complete geographical analysis", body = GeoAnalysis),
        (status = 500, description = "Analysis failed", body = ErrorBody)
    )
)]
pub async fn geographical_analysis(
    State(state): State<AppState>,
) -> Result<Json<Arc<GeoAnalysis>>, ApiError> {
    tracing::info!("Running geographical analysis...");
    Ok(Json(geo_analysis(&state, "Geographical analysis").await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/countries",
    tag = "Geographical Analysis",
    responses(
        (status = 200, description = "Per-country performance", body = CountriesResponse),
        (status = 500, description = "Analysis failed", body = ErrorBody)
    )
)]
pub async fn countries(State(state): State<AppState>) -> Result<Json<CountriesResponse>, ApiError> {
    let analysis = geo_analysis(&state, "Country analysis").await?;
    Ok(Json(CountriesResponse {
        country_analysis: analysis.country_analysis.clone(),
        timestamp: analysis.timestamp,
        status: SUCCESS.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/market-recommendations",
    tag = "Geographical Analysis",
    responses(
        (status = 200, description = "Market recommendations", body = MarketRecommendationsResponse),
        (status = 500, description = "Analysis failed", body = ErrorBody)
    )
)]
pub async fn market_recommendations(
    State(state): State<AppState>,
) -> Result<Json<MarketRecommendationsResponse>, ApiError> {
    let analysis = geo_analysis(&state, "Market recommendations").await?;
    Ok(Json(MarketRecommendationsResponse {
        recommendations: analysis.recommendations.clone(),
        summary: analysis.summary.clone(),
        timestamp: analysis.timestamp,
        status: SUCCESS.to_string(),
    }))
}

use crate::domain::model::{
    CountryAnalysis, GeoSummary, MarketRecommendation, MlSummary, Recommendation, ScoredLead,
};
use crate::utils::error::ServiceError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub const SUCCESS: &str = "success";

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub description: String,
    pub documentation: String,
    pub features: ServiceFeatures,
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceFeatures {
    pub ml_models: Vec<String>,
    pub geographical_analysis: Vec<String>,
}

/// `/health` body. `error` is only present when the repository ping failed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub database: String,
    pub ml_engine: String,
    pub geo_engine: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SummaryResponse {
    pub summary: MlSummary,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopLeadsResponse {
    pub top_leads: Vec<ScoredLead>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AtRiskLeadsResponse {
    pub at_risk_leads: Vec<ScoredLead>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CountriesResponse {
    pub country_analysis: CountryAnalysis,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarketRecommendationsResponse {
    pub recommendations: Vec<MarketRecommendation>,
    pub summary: GeoSummary,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Every error response carries this body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    /// 記錄錯誤後轉成 HTTP 回應
    pub fn logged(context: &str, err: ServiceError) -> Self {
        tracing::error!(
            "{} failed: {} (Category: {:?}, Severity: {:?})",
            context,
            err,
            err.category(),
            err.severity()
        );
        Self::from(err)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::ValidationError { message } => Self::bad_request(message),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

/// Gives bodiless error responses produced by the framework (unknown route,
/// wrong method, request timeout) the same `{"detail": ...}` body as handler
/// errors. Headers such as `Allow` are kept.
pub async fn json_error_bodies(response: Response) -> Response {
    let status = response.status();
    let is_error = status.is_client_error() || status.is_server_error();
    if !is_error || response.headers().contains_key(header::CONTENT_TYPE) {
        return response;
    }

    let detail = status.canonical_reason().unwrap_or("Request failed");
    let (mut parts, _) = response.into_parts();
    let (body_parts, body) = ApiError::new(status, detail).into_response().into_parts();

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.extend(body_parts.headers);
    Response::from_parts(parts, body)
}

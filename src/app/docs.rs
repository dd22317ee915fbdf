use crate::app::routes;
use crate::config::ApiInfo;
use axum::Router;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

pub const DOCS_PATH: &str = "/docs";
pub const REDOC_PATH: &str = "/redoc";
pub const OPENAPI_PATH: &str = "/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        description = "Complete Lead Intelligence Platform: ML lead scoring, churn prediction, segmentation, recommendations and geographical market analysis"
    ),
    paths(
        routes::root,
        routes::health,
        routes::score_all_leads,
        routes::summary,
        routes::top_leads,
        routes::at_risk_leads,
        routes::recommendations,
        routes::geographical_analysis,
        routes::countries,
        routes::market_recommendations,
    ),
    tags(
        (name = "Root", description = "API information"),
        (name = "Health", description = "Service and database status"),
        (name = "ML Models", description = "Lead scoring, churn risk, segmentation and recommendations"),
        (name = "Geographical Analysis", description = "Country, region and market concentration analysis")
    )
)]
struct ApiDoc;

/// OpenAPI document titled and versioned like the running service.
pub fn openapi(api: &ApiInfo) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = api.title.clone();
    doc.info.version = api.version.clone();
    doc
}

/// Swagger UI at `/docs`, ReDoc at `/redoc`, raw document at `/openapi.json`.
pub fn docs_router<S>(api: &ApiInfo) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let doc = openapi(api);
    Router::new()
        .merge(SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, doc.clone()))
        .merge(Redoc::with_url(REDOC_PATH, doc))
}

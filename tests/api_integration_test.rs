use async_trait::async_trait;
use chrono::{Duration, Utc};
use lead_intel::adapters::InMemoryLeadRepository;
use lead_intel::config::settings::Settings;
use lead_intel::config::toml_config::TomlConfig;
use lead_intel::domain::model::Lead;
use lead_intel::domain::ports::LeadRepository;
use lead_intel::{Application, Result, ServiceConfig, ServiceError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestApp {
    base_url: String,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<()>>,
}

impl TestApp {
    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let result = self.handle.await.unwrap();
        assert!(result.is_ok());
    }
}

fn test_config() -> ServiceConfig {
    let settings = Settings {
        leads_csv: Some("unused.csv".to_string()),
        server_host: Some("127.0.0.1".to_string()),
        server_port: Some(0),
        ..Settings::default()
    };
    ServiceConfig::resolve(settings, TomlConfig::default()).unwrap()
}

fn lead(id: i64, country: &str, days_inactive: i64, converted: bool) -> Lead {
    Lead {
        id,
        name: format!("Lead {}", id),
        email: Some(format!("lead{}@example.com", id)),
        company: Some(format!("Company {}", id)),
        country: Some(country.to_string()),
        source: Some("referral".to_string()),
        status: Some("qualified".to_string()),
        deal_value: 5_000.0 * id as f64,
        interactions: (id * 2) as i32,
        created_at: Utc::now() - Duration::days(200),
        last_activity_at: Some(Utc::now() - Duration::days(days_inactive)),
        converted,
    }
}

fn sample_leads() -> Vec<Lead> {
    vec![
        lead(1, "USA", 2, true),
        lead(2, "United States", 5, false),
        lead(3, "Germany", 10, false),
        lead(4, "Brazil", 150, false),
        lead(5, "Japan", 1, false),
        lead(6, "uk", 40, false),
    ]
}

async fn spawn_app(repository: Arc<dyn LeadRepository>) -> TestApp {
    let app = Application::with_repository(&test_config(), repository)
        .await
        .unwrap();
    let base_url = format!("http://{}", app.local_addr());
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(app.run_until(async {
        let _ = rx.await;
    }));

    TestApp {
        base_url,
        client: reqwest::Client::new(),
        shutdown: Some(tx),
        handle,
    }
}

/// 啟動後可切換成離線狀態的資料來源
struct SwitchableRepository {
    inner: InMemoryLeadRepository,
    online: AtomicBool,
}

#[async_trait]
impl LeadRepository for SwitchableRepository {
    async fn ping(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            self.inner.ping().await
        } else {
            Err(ServiceError::RepositoryUnavailable {
                message: "connection reset by peer".to_string(),
            })
        }
    }

    async fn fetch_active_leads(&self) -> Result<Vec<Lead>> {
        self.ping().await?;
        self.inner.fetch_active_leads().await
    }

    fn describe(&self) -> String {
        "switchable".to_string()
    }
}

#[tokio::test]
async fn test_root_describes_service() {
    let app = spawn_app(Arc::new(InMemoryLeadRepository::new(sample_leads()))).await;

    let response = app.get("/").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["service"], "Lead Intelligence API");
    assert_eq!(body["version"], "2.0.0");
    assert_eq!(body["status"], "active");
    assert_eq!(body["documentation"], "/docs");
    assert!(body["features"]["ml_models"].is_array());
    assert_eq!(body["endpoints"]["health"], "GET /health");

    app.stop().await;
}

#[tokio::test]
async fn test_health_reports_connected_database() {
    let app = spawn_app(Arc::new(InMemoryLeadRepository::new(sample_leads()))).await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["ml_engine"], "operational");
    assert_eq!(body["geo_engine"], "operational");
    assert!(body["timestamp"].is_string());
    assert!(body.get("error").is_none());

    app.stop().await;
}

#[tokio::test]
async fn test_health_and_analysis_after_database_loss() {
    let repository = Arc::new(SwitchableRepository {
        inner: InMemoryLeadRepository::new(sample_leads()),
        online: AtomicBool::new(true),
    });
    let app = spawn_app(repository.clone()).await;

    repository.online.store(false, Ordering::SeqCst);

    // 資料庫斷線時仍回 200，狀態寫在 body
    let response = app.get("/health").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"], "disconnected");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("connection reset by peer"));

    let response = app.get("/api/v1/summary").await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("connection reset by peer"));

    let response = app.post("/api/v1/geographical-analysis").await;
    assert_eq!(response.status(), 500);

    repository.online.store(true, Ordering::SeqCst);
    assert_eq!(app.get("/health").await.status(), 200);

    app.stop().await;
}

#[tokio::test]
async fn test_ml_endpoints() {
    let app = spawn_app(Arc::new(InMemoryLeadRepository::new(sample_leads()))).await;

    let response = app.post("/api/v1/score-all-leads").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["summary"]["total_leads"], 6);
    assert_eq!(body["scored_leads"].as_array().unwrap().len(), 6);
    assert!(body["top_leads"]
        .as_array()
        .unwrap()
        .iter()
        .all(|l| l["lead_id"] != 1));

    let body: Value = app.get("/api/v1/summary").await.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["summary"]["total_leads"], 6);

    let body: Value = app.get("/api/v1/at-risk-leads").await.json().await.unwrap();
    let at_risk = body["at_risk_leads"].as_array().unwrap();
    assert_eq!(body["count"], at_risk.len());
    assert!(at_risk.iter().any(|l| l["lead_id"] == 4));

    let body: Value = app.get("/api/v1/recommendations").await.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(
        body["count"],
        body["recommendations"].as_array().unwrap().len()
    );

    app.stop().await;
}

#[tokio::test]
async fn test_top_leads_limit() {
    let app = spawn_app(Arc::new(InMemoryLeadRepository::new(sample_leads()))).await;

    let body: Value = app.get("/api/v1/top-leads/2").await.json().await.unwrap();
    assert_eq!(body["count"], 2);
    let top = body["top_leads"].as_array().unwrap();
    assert!(top[0]["score"].as_u64().unwrap() >= top[1]["score"].as_u64().unwrap());

    let body: Value = app.get("/api/v1/top-leads/100").await.json().await.unwrap();
    assert_eq!(body["count"], 5);

    let body: Value = app.get("/api/v1/top-leads/0").await.json().await.unwrap();
    assert_eq!(body["count"], 0);

    let response = app.get("/api/v1/top-leads/101").await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Limit cannot exceed 100");

    for raw in ["abc", "-5"] {
        let response = app.get(&format!("/api/v1/top-leads/{}", raw)).await;
        assert_eq!(response.status(), 400);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid limit"));
    }

    app.stop().await;
}

#[tokio::test]
async fn test_geo_endpoints() {
    let app = spawn_app(Arc::new(InMemoryLeadRepository::new(sample_leads()))).await;

    let response = app.post("/api/v1/geographical-analysis").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["summary"]["total_leads"], 6);
    // "USA" 與 "United States" 合併為同一國家
    let countries = body["country_analysis"]["countries"].as_array().unwrap();
    assert_eq!(countries.len(), 5);
    assert!(body["market_concentration"]["hhi"].as_f64().unwrap() > 0.0);

    let body: Value = app.get("/api/v1/countries").await.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert!(body["country_analysis"]["countries"].is_array());

    let body: Value = app
        .get("/api/v1/market-recommendations")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "success");
    assert!(body["recommendations"].is_array());
    assert_eq!(body["summary"]["total_countries"], 5);

    app.stop().await;
}

#[tokio::test]
async fn test_empty_lead_set_still_succeeds() {
    let app = spawn_app(Arc::new(InMemoryLeadRepository::new(Vec::new()))).await;

    let body: Value = app.get("/api/v1/summary").await.json().await.unwrap();
    assert_eq!(body["summary"]["total_leads"], 0);

    let response = app.post("/api/v1/geographical-analysis").await;
    assert_eq!(response.status(), 200);

    app.stop().await;
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = spawn_app(Arc::new(InMemoryLeadRepository::new(sample_leads()))).await;

    let response = app
        .client
        .get(format!("{}/health", app.base_url))
        .header("Origin", "https://dashboard.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );

    let preflight = app
        .client
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/api/v1/score-all-leads", app.base_url),
        )
        .header("Origin", "https://dashboard.example.com")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert!(preflight.status().is_success());

    app.stop().await;
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = spawn_app(Arc::new(InMemoryLeadRepository::new(sample_leads()))).await;

    let response = app.get("/api/v1/does-not-exist").await;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Not Found");

    // POST-only route
    let response = app.get("/api/v1/score-all-leads").await;
    assert_eq!(response.status(), 405);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Method Not Allowed");

    app.stop().await;
}

#[tokio::test]
async fn test_api_documentation_is_served() {
    let app = spawn_app(Arc::new(InMemoryLeadRepository::new(sample_leads()))).await;

    let response = app.get("/openapi.json").await;
    assert_eq!(response.status(), 200);
    let doc: Value = response.json().await.unwrap();
    assert_eq!(doc["info"]["title"], "Lead Intelligence API");
    assert_eq!(doc["info"]["version"], "2.0.0");
    assert!(doc["paths"]["/api/v1/top-leads/{limit}"]["get"].is_object());
    assert!(doc["paths"]["/api/v1/score-all-leads"]["post"].is_object());

    let response = app.get("/docs/").await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().to_lowercase().contains("swagger"));

    let response = app.get("/redoc").await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().to_lowercase().contains("redoc"));

    app.stop().await;
}

/// 每次讀取都很慢的資料來源，用來觸發請求逾時
struct SlowRepository {
    inner: InMemoryLeadRepository,
    delay: std::time::Duration,
}

#[async_trait]
impl LeadRepository for SlowRepository {
    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    async fn fetch_active_leads(&self) -> Result<Vec<Lead>> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_active_leads().await
    }

    fn describe(&self) -> String {
        "slow".to_string()
    }
}

#[tokio::test]
async fn test_slow_analysis_times_out_with_detail() {
    let mut config = test_config();
    config.server.request_timeout_seconds = 1;
    let repository = Arc::new(SlowRepository {
        inner: InMemoryLeadRepository::new(sample_leads()),
        delay: std::time::Duration::from_secs(5),
    });

    let app = Application::with_repository(&config, repository).await.unwrap();
    let base_url = format!("http://{}", app.local_addr());
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(app.run_until(async {
        let _ = rx.await;
    }));

    let client = reqwest::Client::new();
    let started = std::time::Instant::now();
    let response = client
        .get(format!("{}/api/v1/summary", base_url))
        .send()
        .await
        .unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(4));
    assert_eq!(response.status(), 408);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Request Timeout");

    // 逾時不影響不需讀取資料的路由
    let response = client.get(format!("{}/health", base_url)).send().await.unwrap();
    assert_eq!(response.status(), 200);

    tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}

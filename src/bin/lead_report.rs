use anyhow::Context;
use clap::{Parser, ValueEnum};
use lead_intel::adapters::build_repository;
use lead_intel::config::settings::{self, Settings};
use lead_intel::core::intelligence::{IntelligenceOptions, LeadIntelligence};
use lead_intel::utils::{logger, validation::Validate};
use lead_intel::{GeoEngine, MlEngine, ServiceConfig};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Only {
    Ml,
    Geo,
    All,
}

#[derive(Parser)]
#[command(name = "lead-report")]
#[command(about = "Run the lead scoring and geographical analysis once and print the JSON report")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Which analysis to run
    #[arg(long, value_enum, default_value = "all")]
    only: Only,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = settings::load_dotenv() {
        eprintln!("⚠️ {}", e);
    }
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    let config = ServiceConfig::load(args.config.as_deref(), Settings::from_env()?)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    tracing::info!("✅ Configuration loaded and validated successfully");

    let repository = build_repository(&config.source)
        .await
        .context("Failed to open lead source")?;
    let intelligence = LeadIntelligence::new(
        repository,
        MlEngine::new(config.ml.clone())?,
        GeoEngine::new(config.geo.clone())?,
        IntelligenceOptions {
            max_leads: config.max_leads,
            cache_ttl: std::time::Duration::ZERO,
            monitor: config.monitoring.enabled,
        },
    );

    let mut report = serde_json::Map::new();
    report.insert("service".to_string(), json!(config.api.title));
    report.insert("version".to_string(), json!(config.api.version));

    if matches!(args.only, Only::Ml | Only::All) {
        let analysis = intelligence.ml_analysis().await.context("ML analysis failed")?;
        report.insert("ml_analysis".to_string(), serde_json::to_value(&*analysis)?);
    }
    if matches!(args.only, Only::Geo | Only::All) {
        let analysis = intelligence
            .geo_analysis()
            .await
            .context("Geographical analysis failed")?;
        report.insert("geographical_analysis".to_string(), serde_json::to_value(&*analysis)?);
    }

    let body = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, body)
                .await
                .with_context(|| format!("Failed to write report to {}", path))?;
            tracing::info!("📁 Report saved to: {}", path);
            println!("📁 Report saved to: {}", path);
        }
        None => println!("{}", body),
    }

    Ok(())
}

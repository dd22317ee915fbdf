use clap::Parser;
use lead_intel::config::settings::{self, Settings};
use lead_intel::utils::{logger, validation::Validate};
use lead_intel::{Application, CliArgs, ServiceConfig, ServiceError};

async fn start(args: &CliArgs) -> Result<(), ServiceError> {
    let mut config = ServiceConfig::load(args.config.as_deref(), Settings::from_env()?)?;
    args.apply(&mut config);

    // 驗證配置
    config.validate()?;
    if args.verbose {
        tracing::debug!("Service config: {:?}", config);
    }

    if config.monitoring.enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let app = Application::build(&config).await?;
    app.run().await
}

#[tokio::main]
async fn main() {
    if let Err(e) = settings::load_dotenv() {
        eprintln!("⚠️ {}", e);
    }

    let args = CliArgs::parse();

    // 初始化日誌
    logger::init_service_logger(args.verbose, args.json_logs);

    if let Err(e) = start(&args).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Service failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        std::process::exit(e.exit_code());
    }
}

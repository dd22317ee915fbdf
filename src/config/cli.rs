use crate::config::ServiceConfig;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "lead-intel")]
#[command(about = "Lead Intelligence API: ML lead scoring and geographical market analysis")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Interface to bind (overrides SERVER_HOST and [server].host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides SERVER_PORT and [server].port)
    #[arg(short, long)]
    pub port: Option<u16>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Log process CPU / memory after each analysis run
    #[arg(long)]
    pub monitor: bool,
}

impl CliArgs {
    /// 套用命令列覆蓋設定
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
            tracing::info!("🔧 Host overridden to: {}", host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
            tracing::info!("🔧 Port overridden to: {}", port);
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
    }
}

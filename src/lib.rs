pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use app::{AppState, Application};
pub use config::ServiceConfig;
pub use crate::core::{geo_engine::GeoEngine, intelligence::LeadIntelligence, ml_engine::MlEngine};
pub use utils::error::{Result, ServiceError};

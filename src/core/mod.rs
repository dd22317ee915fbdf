pub mod cache;
pub mod geo_engine;
pub mod intelligence;
pub mod ml_engine;
pub mod regions;

pub use crate::domain::model::{GeoAnalysis, Lead, MlAnalysis};
pub use crate::domain::ports::LeadRepository;
pub use crate::utils::error::Result;

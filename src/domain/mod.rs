// Domain layer: lead model, analysis results and the repository port.
// No dependencies beyond std/serde/chrono.

pub mod model;
pub mod ports;

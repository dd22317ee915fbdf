pub mod docs;
pub mod response;
pub mod routes;
pub mod server;

pub use response::ApiError;
pub use server::{AppState, Application};

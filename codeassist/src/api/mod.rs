//! HTTP service in front of [`CodeAssistant`](crate::orchestrator::CodeAssistant)

pub mod routes;
pub mod server;

pub use routes::ApiError;
pub use server::{ApiServer, ApiServerConfig};

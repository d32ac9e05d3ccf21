//! HTTP API layer for the event pipeline.

pub mod extractors;
pub mod ingress;
pub mod response;
pub mod routes;
pub mod state;

pub use ingress::{BatchConfig, BatchIngress, EventIngress};
pub use routes::router;
pub use state::{AppState, PipelineConfig};

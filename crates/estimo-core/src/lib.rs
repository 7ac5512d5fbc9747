//! Configuration, startup barrier and query pipeline for Estimo.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod secret;

pub use config::Config;
pub use error::{QueryError, QueryErrorKind, QueryStage, StartupError};
pub use pipeline::{HealthStatus, Pipeline, PipelineSettings, QueryRequest, QueryResponse};
pub use secret::Secret;

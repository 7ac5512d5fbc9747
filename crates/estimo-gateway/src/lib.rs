//! HTTP gateway exposing the answering pipeline.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use router::build_router;
pub use server::GatewayServer;

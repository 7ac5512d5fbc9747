use std::net::SocketAddr;
use std::sync::Arc;

use estimo_core::Pipeline;
use estimo_llm::LlmProvider;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::router::build_router;

pub(crate) struct AppState<E, G> {
    pub pipeline: Arc<Pipeline<E, G>>,
}

// Derived Clone would require `E: Clone` and `G: Clone`.
impl<E, G> Clone for AppState<E, G> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

pub struct GatewayServer<E, G> {
    addr: SocketAddr,
    max_body_size: usize,
    cors_origins: Vec<String>,
    pipeline: Arc<Pipeline<E, G>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<E, G> GatewayServer<E, G>
where
    E: LlmProvider + 'static,
    G: LlmProvider + 'static,
{
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        pipeline: Arc<Pipeline<E, G>>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let addr: SocketAddr = format!("{bind}:{port}").parse().unwrap_or_else(|e| {
            tracing::warn!("invalid bind '{bind}': {e}, falling back to 127.0.0.1:{port}");
            SocketAddr::from(([127, 0, 0, 1], port))
        });

        if bind == "0.0.0.0" {
            tracing::warn!("gateway binding to 0.0.0.0, reachable from every interface");
        }

        Self {
            addr,
            max_body_size: 65_536,
            cors_origins: Vec::new(),
            pipeline,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the HTTP gateway server.
    ///
    /// Runs until the shutdown channel flips to `true`; in-flight requests
    /// are allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or encounters a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let router = build_router(self.pipeline, self.max_body_size, &self.cors_origins);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| GatewayError::Bind(self.addr.to_string(), e))?;
        tracing::info!("gateway listening on {}", self.addr);

        let mut shutdown_rx = self.shutdown_rx;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                while !*shutdown_rx.borrow_and_update() {
                    if shutdown_rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                tracing::info!("gateway shutting down");
            })
            .await
            .map_err(|e| GatewayError::Server(format!("{e}")))?;

        Ok(())
    }
}

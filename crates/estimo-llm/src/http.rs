//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

/// Create a shared HTTP client with standard Estimo configuration.
///
/// Config: 30s connect timeout, 300s request timeout, rustls TLS,
/// `estimo/{version}` user-agent, redirect limit 10.
///
/// The request timeout is a backstop only. Per-stage deadlines are enforced by
/// the pipeline, which owns the configured embedding and generation timeouts.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(300))
        .user_agent(concat!("estimo/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}

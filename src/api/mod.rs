//! HTTP API for brand-batch
//!
//! Exposes the configured generator as a small proxy so browser clients and
//! the HTTP provider can request single images without holding API keys.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::generation::ImageGenerator;

pub mod handlers;
pub mod models;
pub mod server;

/// API server wrapping one image generator
pub struct ApiServer {
    generator: Arc<dyn ImageGenerator>,
    host: String,
    port: u16,
}

impl ApiServer {
    pub fn new(generator: Arc<dyn ImageGenerator>, host: impl Into<String>, port: u16) -> Self {
        Self {
            generator,
            host: host.into(),
            port,
        }
    }

    /// Run the API server until it fails
    pub async fn start(self) -> Result<()> {
        info!(
            "🚀 Starting API server on {}:{} ({:?} provider)",
            self.host,
            self.port,
            self.generator.provider_type()
        );
        server::start_http_server(self.generator, &self.host, self.port).await
    }
}

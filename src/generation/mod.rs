pub mod providers;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GenerationError;
use crate::image_data::EncodedImage;

/// Image generation backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeneratorProvider {
    /// Google Gemini `generateContent` with image output
    Gemini,
    /// A proxy endpoint speaking `{"prompt"}` -> `{"b64_json", "mimeType"}`
    Http,
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: GeneratorProvider,
    /// Base URL for Gemini, full request URL for the HTTP provider. Gemini
    /// falls back to the public API when unset.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GeneratorProvider::Gemini,
            endpoint: None,
            api_key: None,
            model: "gemini-2.0-flash-exp".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Trait for image generation providers
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image for a fully assembled prompt
    async fn generate(&self, prompt: &str) -> Result<EncodedImage, GenerationError>;
    fn provider_type(&self) -> GeneratorProvider;
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn ImageGenerator>> {
    match config.provider {
        GeneratorProvider::Gemini => Ok(Arc::new(providers::GeminiProvider::new(config.clone())?)),
        GeneratorProvider::Http => Ok(Arc::new(providers::HttpProvider::new(config.clone())?)),
    }
}

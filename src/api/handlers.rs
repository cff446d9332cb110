//! API request handlers

use std::sync::Arc;
use tracing::{info, warn};

use super::models::{ApiError, GenerateImageRequest, GenerateImageResponse, HealthResponse};
use crate::generation::ImageGenerator;

/// Handle health check requests
pub fn health_check(generator: &dyn ImageGenerator) -> HealthResponse {
    HealthResponse {
        status: "healthy".to_string(),
        service: "brand-batch".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: format!("{:?}", generator.provider_type()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Generate one image for the prompt in `request`
pub async fn generate_image(
    generator: &Arc<dyn ImageGenerator>,
    request: GenerateImageRequest,
) -> Result<GenerateImageResponse, ApiError> {
    let prompt = request
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Prompt is required".to_string()))?;

    info!("🎨 API image request: {}", prompt);

    match generator.generate(&prompt).await {
        Ok(image) => Ok(GenerateImageResponse {
            b64_json: image.to_base64(),
            mime_type: image.mime_type,
        }),
        Err(e) => {
            warn!("❌ API image generation failed: {}", e);
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

use super::{GenerationConfig, GeneratorProvider, ImageGenerator};
use crate::error::GenerationError;
use crate::image_data::EncodedImage;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const GEMINI_API_VERSION: &str = "v1beta";
const GEMINI_DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MIME_TYPE: &str = "image/png";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Gemini provider implementation
pub struct GeminiProvider {
    config: GenerationConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiRequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiRequestContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Deserialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    data: Option<String>,
}

impl GeminiProvider {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("Gemini API key required"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn request_url(&self) -> String {
        let base = self
            .config
            .endpoint
            .as_deref()
            .unwrap_or(GEMINI_DEFAULT_ENDPOINT)
            .trim_end_matches('/');

        format!(
            "{}/{}/models/{}:generateContent",
            base, GEMINI_API_VERSION, self.config.model
        )
    }
}

/// Pull the first inline image out of a Gemini response
fn extract_gemini_image(response: GeminiResponse) -> Result<EncodedImage, GenerationError> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| {
            content.parts.into_iter().find_map(|part| {
                part.inline_data
                    .filter(|inline| inline.data.as_deref().is_some_and(|d| !d.is_empty()))
            })
        })
        .ok_or(GenerationError::MissingImage)?;

    let mime_type = inline
        .mime_type
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    let data = inline.data.unwrap_or_default();

    EncodedImage::from_base64(mime_type, &data)
        .map_err(|e| GenerationError::InvalidPayload(e.to_string()))
}

#[async_trait]
impl ImageGenerator for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<EncodedImage, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| GenerationError::NotConfigured("Gemini API key not configured".to_string()))?;

        let request = GeminiRequest {
            contents: vec![GeminiRequestContent {
                role: "user".to_string(),
                parts: vec![GeminiTextPart {
                    text: format!("Generate an image: {}", prompt),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        };

        let url = self.request_url();
        debug!("Sending image request to Gemini model {}", self.config.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status,
                body: truncate_body(&text),
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        extract_gemini_image(gemini_response)
    }

    fn provider_type(&self) -> GeneratorProvider {
        GeneratorProvider::Gemini
    }
}

/// Provider for a generation proxy endpoint
pub struct HttpProvider {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    b64_json: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyError {
    error: String,
}

impl HttpProvider {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| anyhow!("HTTP generator endpoint not configured"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { endpoint, client })
    }
}

fn extract_proxy_image(response: ProxyResponse) -> Result<EncodedImage, GenerationError> {
    let payload = response
        .b64_json
        .filter(|data| !data.is_empty())
        .ok_or(GenerationError::MissingImage)?;
    let mime_type = response
        .mime_type
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    EncodedImage::from_base64(mime_type, &payload)
        .map_err(|e| GenerationError::InvalidPayload(e.to_string()))
}

#[async_trait]
impl ImageGenerator for HttpProvider {
    async fn generate(&self, prompt: &str) -> Result<EncodedImage, GenerationError> {
        debug!("Sending image request to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProxyRequest { prompt })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ProxyError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(GenerationError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let proxy_response: ProxyResponse = response.json().await?;
        extract_proxy_image(proxy_response)
    }

    fn provider_type(&self) -> GeneratorProvider {
        GeneratorProvider::Http
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut short: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    short.push('…');
    short
}

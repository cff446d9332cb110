use base64::{engine::general_purpose, Engine};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::DataUriError;

static DATA_URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:([^;,]+);base64,(.+)$").expect("data URI pattern is valid")
});

/// Encoded raster bytes (PNG, JPEG, ...) together with their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// PNG-encoded bytes
    pub fn png(data: Vec<u8>) -> Self {
        Self::new("image/png", data)
    }

    /// Wrap raw bytes, sniffing the MIME type from the content.
    ///
    /// Falls back to `application/octet-stream` when the format is unknown;
    /// decoding such data later fails the way any corrupt raster would.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime_type = image::guess_format(&data)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        Self { mime_type, data }
    }

    /// Decode a base64 payload as returned by the generation services
    pub fn from_base64(mime_type: impl Into<String>, payload: &str) -> Result<Self, DataUriError> {
        let data = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| DataUriError::InvalidBase64(e.to_string()))?;
        Ok(Self::new(mime_type, data))
    }

    /// Parse `data:<mime>;base64,<payload>`
    pub fn from_data_uri(uri: &str) -> Result<Self, DataUriError> {
        let captures = DATA_URI_PATTERN
            .captures(uri.trim())
            .ok_or(DataUriError::InvalidFormat)?;

        Self::from_base64(&captures[1], &captures[2])
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// File extension matching the MIME type, `png` when unknown
    pub fn file_extension(&self) -> &'static str {
        image::ImageFormat::from_mime_type(&self.mime_type)
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("png")
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

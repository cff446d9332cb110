use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::compositor::CompositingConfig;
use crate::generation::{GenerationConfig, GeneratorProvider};
use crate::logo::{LogoSettings, MAX_LOGO_SIZE_PERCENT, MIN_LOGO_SIZE_PERCENT};
use crate::prompts::BrandStyle;

/// Largest accepted edge padding, percent of image width
const MAX_PADDING_PERCENT: f64 = 25.0;

/// Configuration for brand-batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image generation backend
    pub generation: GenerationConfig,

    /// Logo applied to every generated image
    pub logo: LogoSettings,

    /// Padding and badge used when compositing the logo
    pub compositing: CompositingConfig,

    /// Brand guidelines prepended to prompts
    pub brand: BrandStyle,

    /// Output and logging settings
    pub output: OutputConfig,

    /// HTTP server settings
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that exported images are written to
    pub base_dir: PathBuf,

    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,

    /// Write `batch_results.json` next to the images
    pub write_results_json: bool,

    /// Also pack the images into `generated-images-{ms}.zip`
    pub write_zip: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./output"),
            log_level: "info".to_string(),
            write_results_json: true,
            write_zip: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Config {
    /// Load configuration from the first readable config file, falling back
    /// to defaults with environment overrides
    pub fn load() -> Result<Self> {
        for path in Self::search_paths() {
            if !path.is_file() {
                continue;
            }
            match Self::load_from(&path) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!("Failed to load config file {}: {:#}", path.display(), e),
            }
        }

        Self::from_env()
    }

    /// Load configuration from an explicit file; environment variables still
    /// take precedence over values in the file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.apply_env(|key| std::env::var(key).ok());
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Default configuration with environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("brand-batch.toml"),
            PathBuf::from("config/brand-batch.toml"),
        ];
        if let Ok(home) = std::env::var("HOME") {
            paths.push(Path::new(&home).join(".config/brand-batch/config.toml"));
        }
        paths
    }

    /// Override settings from `BRAND_BATCH_*` variables
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("BRAND_BATCH_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "gemini" => self.generation.provider = GeneratorProvider::Gemini,
                "http" | "proxy" => self.generation.provider = GeneratorProvider::Http,
                other => tracing::warn!("Unknown BRAND_BATCH_PROVIDER '{}', keeping {:?}", other, self.generation.provider),
            }
        }

        if let Some(endpoint) = lookup("BRAND_BATCH_ENDPOINT") {
            self.generation.endpoint = Some(endpoint);
        }

        if let Some(api_key) = lookup("BRAND_BATCH_API_KEY").or_else(|| lookup("GEMINI_API_KEY")) {
            self.generation.api_key = Some(api_key);
        }

        if let Some(model) = lookup("BRAND_BATCH_MODEL") {
            self.generation.model = model;
        }

        if let Some(output_dir) = lookup("BRAND_BATCH_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(output_dir);
        }

        if let Some(log_level) = lookup("BRAND_BATCH_LOG_LEVEL") {
            self.output.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let generation = &self.generation;

        if generation.timeout_seconds == 0 {
            return Err(anyhow!("generation.timeout_seconds must be greater than 0"));
        }

        if generation.model.trim().is_empty() && generation.provider == GeneratorProvider::Gemini {
            return Err(anyhow!("generation.model is required for the Gemini provider"));
        }

        match generation.provider {
            GeneratorProvider::Gemini => {
                if generation.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                    return Err(anyhow!("API key required for the Gemini provider"));
                }
            }
            GeneratorProvider::Http => {
                if generation.endpoint.is_none() {
                    return Err(anyhow!("Endpoint required for the HTTP provider"));
                }
            }
        }

        if let Some(endpoint) = &generation.endpoint {
            let parsed = url::Url::parse(endpoint)
                .with_context(|| format!("Invalid generation endpoint '{}'", endpoint))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow!("Generation endpoint must be http or https, got '{}'", parsed.scheme()));
            }
        }

        if !(MIN_LOGO_SIZE_PERCENT..=MAX_LOGO_SIZE_PERCENT).contains(&self.logo.size) {
            return Err(anyhow!(
                "logo.size must be between {} and {}",
                MIN_LOGO_SIZE_PERCENT,
                MAX_LOGO_SIZE_PERCENT
            ));
        }

        if !(0.0..=100.0).contains(&self.logo.opacity) {
            return Err(anyhow!("logo.opacity must be between 0 and 100"));
        }

        if !(0.0..=MAX_PADDING_PERCENT).contains(&self.compositing.padding_percent) {
            return Err(anyhow!("compositing.padding_percent must be between 0 and {}", MAX_PADDING_PERCENT));
        }

        if let Some(badge) = &self.compositing.badge {
            if badge.padding < 0.0 || badge.corner_radius < 0.0 {
                return Err(anyhow!("badge padding and corner radius must not be negative"));
            }
        }

        if self.api.port == 0 {
            return Err(anyhow!("api.port must be greater than 0"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Brand Batch Configuration:\n\
            - Provider: {:?}\n\
            - Model: {}\n\
            - Endpoint: {}\n\
            - Logo: {}\n\
            - Logo Placement: {} at {}% width, {}% opacity\n\
            - Badge Enabled: {}\n\
            - Brand: {}\n\
            - Output Directory: {}\n\
            - ZIP Archive: {}",
            self.generation.provider,
            self.generation.model,
            self.generation.endpoint.as_deref().unwrap_or(match self.generation.provider {
                GeneratorProvider::Gemini => "(public API)",
                GeneratorProvider::Http => "(none)",
            }),
            if self.logo.is_enabled() { "configured" } else { "none" },
            self.logo.position,
            self.logo.size,
            self.logo.opacity,
            self.compositing.badge.is_some(),
            if self.brand.brand_name.is_empty() { "(none)" } else { self.brand.brand_name.as_str() },
            self.output.base_dir.display(),
            self.output.write_zip,
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_provider(mut self, provider: GeneratorProvider) -> Self {
        self.config.generation.provider = provider;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.generation.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.generation.api_key = Some(api_key.into());
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_logo(mut self, logo: LogoSettings) -> Self {
        self.config.logo = logo;
        self
    }

    pub fn with_brand(mut self, brand: BrandStyle) -> Self {
        self.config.brand = brand;
        self
    }

    pub fn with_compositing(mut self, compositing: CompositingConfig) -> Self {
        self.config.compositing = compositing;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.api.port = port;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

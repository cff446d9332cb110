use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::compositor::{BadgeStyle, CompositeOptions};

/// Smallest logo width accepted from user settings (percent of image width)
pub const MIN_LOGO_SIZE_PERCENT: f64 = 10.0;

/// Largest logo width accepted from user settings (percent of image width)
pub const MAX_LOGO_SIZE_PERCENT: f64 = 50.0;

/// Logo settings shared between the caller and a running batch.
///
/// The runner takes a snapshot once per job, so edits made while a batch is
/// running only apply to jobs that have not started yet.
pub type SharedLogoSettings = Arc<RwLock<LogoSettings>>;

/// Corner of the image the logo is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

impl LogoPosition {
    pub fn is_right(&self) -> bool {
        matches!(self, Self::BottomRight | Self::TopRight)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Self::BottomRight | Self::BottomLeft)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
        }
    }
}

impl fmt::Display for LogoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogoPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "bottom-right" => Ok(Self::BottomRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "top-right" => Ok(Self::TopRight),
            "top-left" => Ok(Self::TopLeft),
            other => Err(format!(
                "unknown logo position '{}' (expected bottom-right, bottom-left, top-right or top-left)",
                other
            )),
        }
    }
}

/// User-facing logo configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoSettings {
    /// Logo as a data URI; empty disables compositing
    pub url: String,

    /// Corner the logo is placed in
    pub position: LogoPosition,

    /// Logo width as a percentage of the image width
    pub size: f64,

    /// Logo opacity in percent
    pub opacity: f64,
}

impl Default for LogoSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            position: LogoPosition::BottomRight,
            size: 25.0,
            opacity: 100.0,
        }
    }
}

impl LogoSettings {
    /// Defaults used by the watermark profile: same placement, 80% opacity
    pub fn watermark() -> Self {
        Self {
            opacity: 80.0,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_position(mut self, position: LogoPosition) -> Self {
        self.position = position;
        self
    }

    /// Set the logo size, clamped to the supported range
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size.clamp(MIN_LOGO_SIZE_PERCENT, MAX_LOGO_SIZE_PERCENT);
        self
    }

    /// Set the opacity, clamped to 0-100
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 100.0);
        self
    }

    /// Build compositor options from these settings
    pub fn composite_options(&self, padding_percent: f64, badge: Option<BadgeStyle>) -> CompositeOptions {
        CompositeOptions {
            size_percent: self.size,
            padding_percent,
            position: self.position,
            opacity: self.opacity,
            badge,
        }
    }

    pub fn into_shared(self) -> SharedLogoSettings {
        Arc::new(RwLock::new(self))
    }
}

//! Logo compositing.
//!
//! Stamps a logo onto one corner of a generated image. Placement is computed
//! in floating point from the base image width: the logo width is a
//! percentage of it, the height follows the logo's own aspect ratio, and the
//! padding (horizontal and vertical alike) is a percentage of the width too.
//!
//! A logo that cannot be decoded never fails the operation; the base image
//! is returned untouched. Only an undecodable base image is an error.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::CompositeError;
use crate::image_data::EncodedImage;
use crate::logo::LogoPosition;

/// Rounded backing plate drawn behind the logo
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadgeStyle {
    /// RGBA fill color
    pub color: [u8; 4],

    /// Space between the logo and the badge edge, in pixels
    pub padding: f64,

    /// Corner radius in pixels
    pub corner_radius: f64,
}

impl Default for BadgeStyle {
    fn default() -> Self {
        Self {
            color: [255, 255, 255, 217],
            padding: 8.0,
            corner_radius: 6.0,
        }
    }
}

/// Options for a single compositing pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeOptions {
    /// Logo width as a percentage of the base width
    pub size_percent: f64,

    /// Margin from the chosen edges as a percentage of the base width
    pub padding_percent: f64,

    pub position: LogoPosition,

    /// Logo opacity, 0-100
    pub opacity: f64,

    pub badge: Option<BadgeStyle>,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            size_percent: 25.0,
            padding_percent: 3.0,
            position: LogoPosition::BottomRight,
            opacity: 100.0,
            badge: None,
        }
    }
}

/// Compositing parameters that are not part of the user's logo settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositingConfig {
    /// Margin from the image edges as a percentage of the image width
    pub padding_percent: f64,

    /// Optional backing plate behind the logo
    #[serde(default)]
    pub badge: Option<BadgeStyle>,
}

impl Default for CompositingConfig {
    fn default() -> Self {
        Self {
            padding_percent: 3.0,
            badge: None,
        }
    }
}

/// Where and how large the logo is drawn, in base-image pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoPlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LogoPlacement {
    pub fn compute(
        base_width: u32,
        base_height: u32,
        logo_width: u32,
        logo_height: u32,
        options: &CompositeOptions,
    ) -> Self {
        let base_width = base_width as f64;
        let base_height = base_height as f64;

        let width = base_width * options.size_percent / 100.0;
        let aspect_ratio = logo_width as f64 / logo_height as f64;
        let height = width / aspect_ratio;

        // Vertical padding is also derived from the width
        let padding = base_width * options.padding_percent / 100.0;

        let x = if options.position.is_right() {
            base_width - width - padding
        } else {
            padding
        };
        let y = if options.position.is_bottom() {
            base_height - height - padding
        } else {
            padding
        };

        Self { x, y, width, height }
    }

    /// Rounded drawing size, `None` when it rounds to nothing
    fn pixel_size(&self) -> Option<(f64, f64)> {
        if !self.width.is_finite() || !self.height.is_finite() {
            return None;
        }
        let width = self.width.round();
        let height = self.height.round();
        if width < 1.0 || height < 1.0 {
            return None;
        }
        Some((width, height))
    }
}

/// Part of a placed logo that lands on the canvas, in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VisibleRect {
    x_start: u32,
    x_end: u32,
    y_start: u32,
    y_end: u32,
}

impl VisibleRect {
    fn clip(origin_x: f64, origin_y: f64, width: f64, height: f64, canvas: &RgbaImage) -> Option<Self> {
        let canvas_width = canvas.width() as f64;
        let canvas_height = canvas.height() as f64;

        let x_start = origin_x.max(0.0);
        let x_end = (origin_x + width).min(canvas_width);
        let y_start = origin_y.max(0.0);
        let y_end = (origin_y + height).min(canvas_height);
        if x_start >= x_end || y_start >= y_end {
            return None;
        }

        Some(Self {
            x_start: x_start as u32,
            x_end: x_end as u32,
            y_start: y_start as u32,
            y_end: y_end as u32,
        })
    }
}

/// Composite `logo` onto `base` and return the result as PNG.
pub fn composite(
    base: &EncodedImage,
    logo: &EncodedImage,
    options: &CompositeOptions,
) -> Result<EncodedImage, CompositeError> {
    let base_image = image::load_from_memory(&base.data).map_err(CompositeError::BaseDecode)?;

    let logo_image = match image::load_from_memory(&logo.data) {
        Ok(image) if image.width() > 0 && image.height() > 0 => image,
        Ok(_) => {
            warn!("Logo has no pixels, keeping original image");
            return Ok(base.clone());
        }
        Err(e) => {
            warn!("Logo could not be decoded, keeping original image: {}", e);
            return Ok(base.clone());
        }
    };

    let mut canvas = base_image.to_rgba8();
    let placement = LogoPlacement::compute(
        canvas.width(),
        canvas.height(),
        logo_image.width(),
        logo_image.height(),
        options,
    );

    debug!(
        "Placing logo at ({:.1}, {:.1}) size {:.1}x{:.1} on {}x{} image",
        placement.x,
        placement.y,
        placement.width,
        placement.height,
        canvas.width(),
        canvas.height()
    );

    if let Some(badge) = &options.badge {
        draw_badge(&mut canvas, &placement, badge);
    }
    draw_logo(&mut canvas, &logo_image, &placement, options.opacity);

    encode_png(canvas)
}

/// Run [`composite`] on the blocking pool.
///
/// Decoding, resampling and PNG encoding are CPU-bound, so this keeps the
/// runtime responsive while still being a single await for the caller.
pub async fn composite_async(
    base: EncodedImage,
    logo: EncodedImage,
    options: CompositeOptions,
) -> Result<EncodedImage, CompositeError> {
    tokio::task::spawn_blocking(move || composite(&base, &logo, &options)).await?
}

fn draw_logo(canvas: &mut RgbaImage, logo: &DynamicImage, placement: &LogoPlacement, opacity: f64) {
    let Some((width, height)) = placement.pixel_size() else {
        debug!("Logo size rounds to zero pixels, skipping draw");
        return;
    };

    let alpha = (opacity / 100.0).clamp(0.0, 1.0) as f32;
    if alpha <= 0.0 {
        return;
    }

    let origin_x = placement.x.round();
    let origin_y = placement.y.round();
    let Some(visible) = VisibleRect::clip(origin_x, origin_y, width, height, canvas) else {
        debug!("Logo falls outside the canvas, skipping draw");
        return;
    };

    let source = logo.to_rgba8();

    // A scaled copy is only materialised while it is no larger than the canvas
    if width * height <= canvas.width() as f64 * canvas.height() as f64 {
        let scaled = imageops::resize(&source, width as u32, height as u32, FilterType::Triangle);
        for py in visible.y_start..visible.y_end {
            for px in visible.x_start..visible.x_end {
                let sx = (px as f64 - origin_x) as u32;
                let sy = (py as f64 - origin_y) as u32;
                source_over(canvas.get_pixel_mut(px, py), scaled.get_pixel(sx, sy), alpha);
            }
        }
    } else {
        for py in visible.y_start..visible.y_end {
            let v = ((py as f64 + 0.5 - origin_y) / height).clamp(0.0, 1.0) as f32;
            for px in visible.x_start..visible.x_end {
                let u = ((px as f64 + 0.5 - origin_x) / width).clamp(0.0, 1.0) as f32;
                if let Some(sample) = imageops::sample_bilinear(&source, u, v) {
                    source_over(canvas.get_pixel_mut(px, py), &sample, alpha);
                }
            }
        }
    }
}

/// Source-over blend of `src`, with its alpha scaled by `opacity`, onto
/// `dst`. An opaque destination stays opaque.
fn source_over(dst: &mut Rgba<u8>, src: &Rgba<u8>, opacity: f32) {
    let src_alpha = src[3] as f32 / 255.0 * opacity;
    if src_alpha <= 0.0 {
        return;
    }
    let dst_alpha = dst[3] as f32 / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);

    for channel in 0..3 {
        let src_c = src[channel] as f32 / 255.0;
        let dst_c = dst[channel] as f32 / 255.0;
        let premultiplied = src_c * src_alpha + dst_c * dst_alpha * (1.0 - src_alpha);
        dst[channel] = (premultiplied / out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

fn draw_badge(canvas: &mut RgbaImage, placement: &LogoPlacement, badge: &BadgeStyle) {
    let left = placement.x - badge.padding;
    let top = placement.y - badge.padding;
    let right = placement.x + placement.width + badge.padding;
    let bottom = placement.y + placement.height + badge.padding;

    if !(left.is_finite() && top.is_finite() && right.is_finite() && bottom.is_finite()) {
        return;
    }

    let radius = badge
        .corner_radius
        .max(0.0)
        .min((right - left) / 2.0)
        .min((bottom - top) / 2.0);

    let canvas_width = canvas.width() as f64;
    let canvas_height = canvas.height() as f64;
    let x_start = left.floor().clamp(0.0, canvas_width) as u32;
    let x_end = right.ceil().clamp(0.0, canvas_width) as u32;
    let y_start = top.floor().clamp(0.0, canvas_height) as u32;
    let y_end = bottom.ceil().clamp(0.0, canvas_height) as u32;

    let color = Rgba(badge.color);
    for py in y_start..y_end {
        for px in x_start..x_end {
            let cx = px as f64 + 0.5;
            let cy = py as f64 + 0.5;
            if inside_rounded_rect(cx, cy, left, top, right, bottom, radius) {
                source_over(canvas.get_pixel_mut(px, py), &color, 1.0);
            }
        }
    }
}

fn inside_rounded_rect(
    x: f64,
    y: f64,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    radius: f64,
) -> bool {
    if x < left || x > right || y < top || y > bottom {
        return false;
    }
    let nearest_x = x.clamp(left + radius, right - radius);
    let nearest_y = y.clamp(top + radius, bottom - radius);
    let dx = x - nearest_x;
    let dy = y - nearest_y;
    dx * dx + dy * dy <= radius * radius
}

fn encode_png(canvas: RgbaImage) -> Result<EncodedImage, CompositeError> {
    let mut png_bytes = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(CompositeError::Encode)?;
    Ok(EncodedImage::png(png_bytes))
}

//! Remote logo retrieval and compositing.
//!
//! A logo is fetched through a [`LogoSource`], fitted inside the target square
//! minus padding on a transparent tile, laid over an opaque rounded plate and
//! finally pasted onto the centre of the QR raster.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use tracing::debug;

use crate::config::LogoConfig;
use crate::error::{FetchError, GenerateError, GenerateResult};
use crate::params::GenerationRequest;

/// Largest share of the QR side a logo may cover, in percent.
pub const MAX_LOGO_PERCENT: u32 = 40;

// Fetching
//------------------------------------------------------------------------------

#[async_trait]
pub trait LogoSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpLogoFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpLogoFetcher {
    pub fn new(config: &LogoConfig) -> Result<Self, FetchError> {
        Self::from_builder(reqwest::Client::builder(), config)
    }

    /// Applies the configured timeout and user agent on top of `builder`.
    pub fn from_builder(builder: reqwest::ClientBuilder, config: &LogoConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.fetch_timeout_secs);
        let client = builder
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, timeout, max_bytes: config.max_bytes })
    }

    fn map_err(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout.as_secs())
        } else {
            FetchError::Request(err)
        }
    }
}

#[async_trait]
impl LogoSource for HttpLogoFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::UnsupportedScheme(url.to_string()));
        }

        let mut response = self.client.get(url).send().await.map_err(|e| self.map_err(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let limit = self.max_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge { limit });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_err(e))? {
            if body.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        debug!(url, bytes = body.len(), "Fetched logo");
        Ok(body)
    }
}

// Geometry
//------------------------------------------------------------------------------

/// Side of the logo tile for a QR of `size` pixels, with `percent` capped at 40.
pub fn logo_target_size(size: u32, percent: u32) -> u32 {
    (size as u64 * percent.min(MAX_LOGO_PERCENT) as u64 / 100) as u32
}

/// Top-left corner that centres a `target` square on a `size` square.
pub fn logo_offset(size: u32, target: u32) -> u32 {
    size.saturating_sub(target) / 2
}

// Plate & tile
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoStyle {
    pub target: u32,
    pub padding: u32,
    pub plate: Rgba<u8>,
    pub corner_radius: u32,
}

/// Opaque square of side `side` with rounded corners on a transparent canvas.
pub fn rounded_plate(side: u32, color: Rgba<u8>, corner_radius: u32) -> RgbaImage {
    let mut plate = RgbaImage::new(side, side);
    if side == 0 {
        return plate;
    }

    let r = corner_radius.min(side / 2);
    if r == 0 {
        return RgbaImage::from_pixel(side, side, color);
    }

    let inner = side - 2 * r;
    if inner > 0 {
        draw_filled_rect_mut(&mut plate, Rect::at(r as i32, 0).of_size(inner, side), color);
        draw_filled_rect_mut(&mut plate, Rect::at(0, r as i32).of_size(side, inner), color);
    }

    let (near, far) = (r as i32, (side - 1 - r) as i32);
    for center in [(near, near), (far, near), (near, far), (far, far)] {
        draw_filled_circle_mut(&mut plate, center, r as i32, color);
    }
    plate
}

/// Decodes `bytes` and builds the final `target` x `target` logo tile.
pub fn prepare_logo(bytes: &[u8], style: &LogoStyle) -> GenerateResult<RgbaImage> {
    let LogoStyle { target, padding, plate, corner_radius } = *style;
    if target == 0 || padding.saturating_mul(2) >= target {
        return Err(GenerateError::composite(
            "pad logo",
            format!("padding {padding} leaves no room in a {target}px tile"),
        ));
    }

    let logo = image::load_from_memory(bytes).map_err(|e| GenerateError::composite("decode logo", e))?;
    let inner = target - 2 * padding;
    let fitted = logo.resize(inner, inner, FilterType::Lanczos3).to_rgba8();

    // Letterbox onto a transparent tile, centred inside the padding
    let mut tile = RgbaImage::new(target, target);
    let x = padding + (inner - fitted.width().min(inner)) / 2;
    let y = padding + (inner - fitted.height().min(inner)) / 2;
    imageops::overlay(&mut tile, &fitted, x as i64, y as i64);

    let mut composed = rounded_plate(target, plate, corner_radius);
    imageops::overlay(&mut composed, &tile, 0, 0);
    Ok(composed)
}

/// Pastes `tile` onto the centre of `base`.
pub fn overlay_centered(base: &mut RgbaImage, tile: &RgbaImage) {
    let x = logo_offset(base.width(), tile.width());
    let y = logo_offset(base.height(), tile.height());
    imageops::overlay(base, tile, x as i64, y as i64);
}

// Compositor
//------------------------------------------------------------------------------

pub struct LogoCompositor {
    source: Arc<dyn LogoSource>,
    corner_radius: u32,
}

impl LogoCompositor {
    pub fn new(source: Arc<dyn LogoSource>, corner_radius: u32) -> Self {
        Self { source, corner_radius }
    }

    /// Applies the request's logo, if any. A fetch or image failure fails the
    /// whole request; there is no logo-less fallback.
    pub async fn apply(&self, base: &mut RgbaImage, req: &GenerationRequest) -> GenerateResult<()> {
        let Some(url) = req.logo_url.as_deref() else {
            return Ok(());
        };

        let bytes = self.source.fetch(url).await?;
        let style = LogoStyle {
            target: logo_target_size(base.width(), req.logo_size),
            padding: req.logo_padding,
            plate: req.logo_bg_color.to_rgba(),
            corner_radius: self.corner_radius,
        };
        let tile = prepare_logo(&bytes, &style)?;
        overlay_centered(base, &tile);
        debug!(url, target = style.target, "Composited logo");
        Ok(())
    }
}

use image::RgbaImage;
use image::imageops;
use tracing::debug;

use super::{fit_height, open_overlay};
use crate::Result;
use crate::config::{LogoConfig, Position};

/// Composites the configured logo over `img`.
pub fn apply(img: &RgbaImage, config: &LogoConfig) -> Result<RgbaImage> {
    let logo = open_overlay(&config.logo_file)?;
    Ok(apply_with_overlay(img, &logo, config))
}

/// Composites an already loaded logo over `img`.
///
/// The logo is scaled to `logo_scale_ratio` of the base height.
pub fn apply_with_overlay(img: &RgbaImage, logo: &RgbaImage, config: &LogoConfig) -> RgbaImage {
    let (bw, bh) = img.dimensions();
    let target_h = (bh as f32 * config.logo_scale_ratio) as u32;
    let scaled = fit_height(logo, target_h);

    let (x, y) = place((bw, bh), scaled.dimensions(), config.logo_position, config.logo_margin);
    debug!(x, y, width = scaled.width(), height = scaled.height(), "placing logo");

    let mut out = img.clone();
    imageops::overlay(&mut out, &scaled, x, y);
    out
}

/// Top-left corner of an overlay of `overlay` size placed on `base`.
pub fn place(base: (u32, u32), overlay: (u32, u32), position: Position, margin: u32) -> (i64, i64) {
    let (bw, bh) = (base.0 as i64, base.1 as i64);
    let (ow, oh) = (overlay.0 as i64, overlay.1 as i64);
    let m = margin as i64;

    match position {
        Position::TopLeft => (m, m),
        Position::TopRight => (bw - ow - m, m),
        Position::BottomLeft => (m, bh - oh - m),
        Position::BottomRight => (bw - ow - m, bh - oh - m),
        Position::Center => ((bw - ow).div_euclid(2), (bh - oh).div_euclid(2)),
    }
}

use image::RgbaImage;
use image::imageops;
use tracing::debug;

use super::{fit_width, open_overlay};
use crate::Result;
use crate::config::WatermarkConfig;

/// Composites the configured watermark over `img`.
pub fn apply(img: &RgbaImage, config: &WatermarkConfig) -> Result<RgbaImage> {
    let mark = open_overlay(&config.watermark_file)?;
    Ok(apply_with_overlay(img, &mark, config))
}

/// Composites an already loaded watermark over `img`.
///
/// The mark is scaled to `watermark_scale_ratio` of the base width, its alpha
/// is multiplied by the opacity, and it is either centered or tiled from the
/// top-left corner with `watermark_gap` pixels between copies.
pub fn apply_with_overlay(img: &RgbaImage, mark: &RgbaImage, config: &WatermarkConfig) -> RgbaImage {
    let (bw, bh) = img.dimensions();
    let target_w = (bw as f32 * config.watermark_scale_ratio) as u32;
    let mut scaled = fit_width(mark, target_w);
    fade(&mut scaled, config.watermark_opacity);

    let mut out = img.clone();
    let (mw, mh) = scaled.dimensions();

    if config.watermark_tile {
        let step_x = mw.saturating_add(config.watermark_gap).max(1) as usize;
        let step_y = mh.saturating_add(config.watermark_gap).max(1) as usize;
        debug!(step_x, step_y, "tiling watermark");
        for y in (0..bh).step_by(step_y) {
            for x in (0..bw).step_by(step_x) {
                imageops::overlay(&mut out, &scaled, x as i64, y as i64);
            }
        }
    } else {
        let x = (bw as i64 - mw as i64).div_euclid(2);
        let y = (bh as i64 - mh as i64).div_euclid(2);
        imageops::overlay(&mut out, &scaled, x, y);
    }
    out
}

/// Multiplies every alpha value by `opacity`, clamped to `0.0..=1.0`.
fn fade(img: &mut RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    for pixel in img.pixels_mut() {
        pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
    }
}

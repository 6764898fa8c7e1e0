//! Darkening filters and blurred backgrounds for edition canvases.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};

/// Blur radius applied to the vignette mask, in pixels.
const VIGNETTE_BLUR: f32 = 100.0;

/// Largest downscale factor used to approximate wide blurs.
const MAX_BLUR_DOWNSCALE: f32 = 8.0;

/// Darkens the image towards a radial mask centered on the canvas.
///
/// The mask grows from 0 at the center to `intensity` at 1.5 × half the short
/// side, is zero beyond that, and is blurred before compositing black.
pub fn apply_vignette(img: &RgbaImage, intensity: f32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let max_radius = (w.min(h) as f32 / 2.0 * 1.5).floor();
    if max_radius < 1.0 {
        return img.clone();
    }

    let (cx, cy) = ((w / 2) as f32, (h / 2) as f32);
    let intensity = intensity.clamp(0.0, 1.0);
    let mask = GrayImage::from_fn(w, h, |x, y| {
        let distance = (x as f32 - cx).hypot(y as f32 - cy).ceil();
        if distance > max_radius {
            Luma([0])
        } else {
            Luma([(255.0 * (distance / max_radius) * intensity) as u8])
        }
    });

    composite_black(img, &soft_blur_gray(&mask, VIGNETTE_BLUR))
}

/// Darkens the bottom `height_ratio` of the image with a linear fade to `intensity`.
pub fn apply_bottom_shadow(img: &RgbaImage, intensity: f32, height_ratio: f32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let start_y = (h as f32 * (1.0 - height_ratio.clamp(0.0, 1.0))) as u32;
    let span = (h - start_y.min(h)).max(1) as f32;
    let intensity = intensity.clamp(0.0, 1.0);

    let mask = GrayImage::from_fn(w, h, |_, y| {
        if y < start_y {
            Luma([0])
        } else {
            let fade = (y - start_y) as f32 / span;
            Luma([(255.0 * intensity * fade) as u8])
        }
    });

    composite_black(img, &mask)
}

/// Fills `size` with a blurred stretch of `img` and centers a letterboxed copy on top.
pub fn blurred_background(img: &RgbaImage, size: (u32, u32), radius: f32) -> RgbaImage {
    let (target_w, target_h) = (size.0.max(1), size.1.max(1));
    let (w, h) = img.dimensions();

    let stretched = imageops::resize(img, target_w, target_h, FilterType::Lanczos3);
    let mut background = soft_blur(&stretched, radius);
    if w == 0 || h == 0 {
        return background;
    }

    let scale = (target_w as f32 / w as f32).min(target_h as f32 / h as f32);
    let new_w = ((w as f32 * scale) as u32).max(1);
    let new_h = ((h as f32 * scale) as u32).max(1);
    let foreground = imageops::resize(img, new_w, new_h, FilterType::Lanczos3);

    let x = (target_w as i64 - new_w as i64) / 2;
    let y = (target_h as i64 - new_h as i64) / 2;
    imageops::replace(&mut background, &foreground, x, y);
    background
}

/// Gaussian blur that downsamples first when the radius is large.
pub fn soft_blur(img: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let factor = (sigma / 4.0).clamp(1.0, MAX_BLUR_DOWNSCALE);
    if factor <= 1.0 {
        return imageops::blur(img, sigma);
    }

    let small_w = ((w as f32 / factor) as u32).max(1);
    let small_h = ((h as f32 / factor) as u32).max(1);
    let small = imageops::resize(img, small_w, small_h, FilterType::Triangle);
    let blurred = imageops::blur(&small, sigma / factor);
    imageops::resize(&blurred, w, h, FilterType::Triangle)
}

fn soft_blur_gray(mask: &GrayImage, sigma: f32) -> GrayImage {
    let (w, h) = mask.dimensions();
    let factor = (sigma / 4.0).clamp(1.0, MAX_BLUR_DOWNSCALE);
    let small_w = ((w as f32 / factor) as u32).max(1);
    let small_h = ((h as f32 / factor) as u32).max(1);
    let small = imageops::resize(mask, small_w, small_h, FilterType::Triangle);
    let blurred = imageops::blur(&small, sigma / factor);
    imageops::resize(&blurred, w, h, FilterType::Triangle)
}

/// Blends black over `img`, weighting each pixel by `mask`.
fn composite_black(img: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    let mut out = img.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let keep = 1.0 - mask.get_pixel(x, y)[0] as f32 / 255.0;
        for channel in 0..3 {
            pixel[channel] = (pixel[channel] as f32 * keep).round() as u8;
        }
    }
    out
}

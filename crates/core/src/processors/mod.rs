//! Image processors.
//!
//! Each processor takes an RGBA buffer and a typed configuration section and
//! returns a new buffer. This module also holds the decode/encode helpers
//! shared by the media pipeline and the link editions.

pub mod big_text;
pub mod crop;
pub mod filters;
pub mod logo;
pub mod text_render;
pub mod typeface;
pub mod watermark;

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};

use crate::config::OutputFormat;
use crate::{PortadaError, Result};

/// JPEG quality used for every encoded output.
pub const JPEG_QUALITY: u8 = 95;

/// Decodes `bytes` and rotates the result according to its EXIF orientation.
pub fn decode_oriented(bytes: &[u8]) -> Result<RgbaImage> {
    let mut decoder = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image.to_rgba8())
}

/// Opens an overlay image (logo, watermark) from disk.
pub fn open_overlay(path: &Path) -> Result<RgbaImage> {
    if !path.exists() {
        return Err(PortadaError::FileNotFound(path.to_path_buf()));
    }
    Ok(image::open(path)?.to_rgba8())
}

/// Encodes `img` as JPEG (alpha dropped) or PNG.
pub fn encode(img: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))?;
        }
        OutputFormat::Png => {
            img.write_with_encoder(PngEncoder::new(&mut buf))?;
        }
    }
    Ok(buf)
}

/// Resizes `overlay` to `target_h` pixels high, keeping its aspect ratio.
pub(crate) fn fit_height(overlay: &RgbaImage, target_h: u32) -> RgbaImage {
    let (w, h) = overlay.dimensions();
    let target_h = target_h.max(1);
    let target_w = ((w as f64 * target_h as f64 / h.max(1) as f64) as u32).max(1);
    imageops::resize(overlay, target_w, target_h, FilterType::Lanczos3)
}

/// Resizes `overlay` to `target_w` pixels wide, keeping its aspect ratio.
pub(crate) fn fit_width(overlay: &RgbaImage, target_w: u32) -> RgbaImage {
    let (w, h) = overlay.dimensions();
    let target_w = target_w.max(1);
    let target_h = ((h as f64 * target_w as f64 / w.max(1) as f64) as u32).max(1);
    imageops::resize(overlay, target_w, target_h, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_encode_jpeg_and_png() {
        let img = RgbaImage::from_pixel(8, 4, Rgba([10, 200, 30, 128]));

        let jpeg = encode(&img, OutputFormat::Jpeg).unwrap();
        assert_eq!(&jpeg[..3], b"\xff\xd8\xff");

        let png = encode(&img, OutputFormat::Png).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = decode_oriented(&png).unwrap();
        assert_eq!(decoded.get_pixel(3, 3), &Rgba([10, 200, 30, 128]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_oriented(b"definitely not an image").is_err());
    }

    #[test]
    fn test_open_overlay_missing() {
        let err = open_overlay(Path::new("/nonexistent/logo.png")).unwrap_err();
        assert!(matches!(err, PortadaError::FileNotFound(_)));
    }

    #[test]
    fn test_fit_keeps_aspect() {
        let overlay = RgbaImage::new(200, 100);
        assert_eq!(fit_height(&overlay, 50).dimensions(), (100, 50));
        assert_eq!(fit_width(&overlay, 50).dimensions(), (50, 25));
        assert_eq!(fit_height(&overlay, 0).dimensions(), (2, 1));
    }
}

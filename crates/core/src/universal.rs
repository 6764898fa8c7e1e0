//! Caption-driven processing of uploaded images and videos.
//!
//! The input type is sniffed from its magic bytes. Images are decoded, run
//! through the processor selected by the caption and re-encoded. Videos get a
//! transparent overlay built with the same processors and composited by
//! `ffmpeg`; when `ffmpeg` fails the original video comes back unchanged.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use image::{ImageFormat, Rgba, RgbaImage};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::caption::{Effect, classify};
use crate::config::{BigTextConfig, LogoConfig, OutputConfig, Settings, WatermarkConfig};
use crate::editions::{EditionConfig, find_edition, reframe};
use crate::media::MediaKind;
use crate::processors::{big_text, decode_oriented, encode, logo, watermark};
use crate::{PortadaError, Result};

/// Frame size assumed when `ffprobe` cannot read the video.
pub const FALLBACK_VIDEO_SIZE: (u32, u32) = (1920, 1080);

/// Name given to a video returned untouched after an `ffmpeg` failure.
pub const ORIGINAL_VIDEO_NAME: &str = "original_video.mp4";

/// A processed media file and its suggested name.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub kind: MediaKind,
}

impl Rendered {
    /// MIME type to upload the file with.
    pub fn mime(&self) -> &'static str {
        match self.kind {
            MediaKind::Video => MediaKind::video_mime(),
            MediaKind::Image => {
                if self.filename.ends_with(".png") {
                    "image/png"
                } else {
                    "image/jpeg"
                }
            }
        }
    }
}

/// `{YYYYmmdd-HHMMSS}-{6 hex}` suffix for generated filenames.
pub fn unique_suffix() -> String {
    let stamp = OffsetDateTime::now_utc()
        .format(format_description!("[year][month][day]-[hour][minute][second]"))
        .unwrap_or_else(|_| "00000000-000000".to_string());
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}", stamp, &random[..6])
}

/// `{kind}-{suffix}.{extension}`.
pub fn suggested_filename(kind: &str, extension: &str) -> String {
    format!("{}-{}.{}", kind, unique_suffix(), extension)
}

/// Processes an image or video according to `caption`.
///
/// `recorte` and `blur` captions leave images untouched; use
/// [`process_media_with_editions`] to reframe them with an edition layout.
pub fn process_media(bytes: &[u8], caption: Option<&str>, settings: &Settings) -> Result<Rendered> {
    process_media_with_editions(bytes, caption, settings, &[])
}

/// Like [`process_media`], reframing `recorte`/`blur` images with the first
/// edition of the same mode.
pub fn process_media_with_editions(
    bytes: &[u8],
    caption: Option<&str>,
    settings: &Settings,
    editions: &[EditionConfig],
) -> Result<Rendered> {
    let effect = classify(caption);
    match MediaKind::detect(bytes) {
        MediaKind::Video => {
            info!(effect = %effect, size = bytes.len(), "processing video");
            process_video(bytes, &effect, settings)
        }
        MediaKind::Image => {
            info!(effect = %effect, size = bytes.len(), "processing image");
            process_image(bytes, &effect, settings, editions)
        }
    }
}

/// Decodes, applies `effect` and re-encodes an image.
pub fn process_image(bytes: &[u8], effect: &Effect, settings: &Settings, editions: &[EditionConfig]) -> Result<Rendered> {
    let base = decode_oriented(bytes)?;
    let result = apply_effect(&base, effect, settings, editions)?;

    let output: OutputConfig = settings.section("output");
    let encoded = encode(&result, output.format)?;
    Ok(Rendered {
        bytes: encoded,
        filename: suggested_filename(effect.kind(), output.format.extension()),
        kind: MediaKind::Image,
    })
}

/// Applies the processor selected by `effect` to an image.
///
/// Big text and free text with an empty body, unknown captions, and
/// `recorte`/`blur` without a matching edition return the image unchanged.
pub fn apply_effect(img: &RgbaImage, effect: &Effect, settings: &Settings, editions: &[EditionConfig]) -> Result<RgbaImage> {
    match effect {
        Effect::Logo => logo::apply(img, &settings.section::<LogoConfig>("logo")),
        Effect::Watermark => watermark::apply(img, &settings.section::<WatermarkConfig>("watermark")),
        Effect::BigText { .. } | Effect::Text { .. } => match effect.text() {
            Some(text) => big_text::apply(img, text, &settings.section::<BigTextConfig>("bigtext")),
            None => Ok(img.clone()),
        },
        Effect::Recorte | Effect::Blur => match effect.edition_mode().and_then(|mode| find_edition(editions, mode)) {
            Some(edition) => {
                debug!(variant = %edition.variant, "reframing with edition layout");
                Ok(reframe(img, edition))
            }
            None => {
                warn!(effect = %effect, "no edition configured for this effect, leaving image unchanged");
                Ok(img.clone())
            }
        },
        Effect::Unknown => Ok(img.clone()),
    }
}

/// Transparent overlay carrying the graphics of `effect`, for compositing over video.
///
/// Processor failures are logged and leave the overlay empty.
pub fn video_overlay(width: u32, height: u32, effect: &Effect, settings: &Settings) -> RgbaImage {
    let blank = RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([0, 0, 0, 0]));
    let drawn = match effect {
        Effect::Logo | Effect::Watermark | Effect::BigText { .. } | Effect::Text { .. } => {
            apply_effect(&blank, effect, settings, &[])
        }
        Effect::Recorte | Effect::Blur | Effect::Unknown => return blank,
    };

    drawn.unwrap_or_else(|e| {
        warn!(effect = %effect, error = %e, "video overlay failed, continuing without it");
        blank
    })
}

/// Composites the overlay for `effect` onto a video with `ffmpeg`.
pub fn process_video(bytes: &[u8], effect: &Effect, settings: &Settings) -> Result<Rendered> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("input_video.mp4");
    let overlay_path = dir.path().join("overlay.png");
    let output = dir.path().join("output_video.mp4");
    fs::write(&input, bytes)?;

    let (width, height) = probe_dimensions(&input).unwrap_or_else(|e| {
        error!(error = %e, "could not probe video, assuming {}x{}", FALLBACK_VIDEO_SIZE.0, FALLBACK_VIDEO_SIZE.1);
        FALLBACK_VIDEO_SIZE
    });
    info!(width, height, "video dimensions");

    video_overlay(width, height, effect, settings).save_with_format(&overlay_path, ImageFormat::Png)?;

    if let Err(e) = run_overlay(&input, &overlay_path, &output) {
        error!(error = %e, "ffmpeg failed, returning the original video");
        return Ok(Rendered { bytes: bytes.to_vec(), filename: ORIGINAL_VIDEO_NAME.to_string(), kind: MediaKind::Video });
    }

    let result = if output.exists() {
        fs::read(&output)?
    } else {
        error!("ffmpeg produced no output, returning the original video");
        bytes.to_vec()
    };

    Ok(Rendered { bytes: result, filename: suggested_filename(effect.kind(), "mp4"), kind: MediaKind::Video })
}

/// Width and height of the first video stream.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries", "stream=width,height", "-of", "csv=s=x:p=0"])
        .arg(path)
        .output()
        .map_err(|e| PortadaError::FfmpegError(format!("failed to spawn ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(PortadaError::FfmpegError(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_dimensions(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| PortadaError::FfmpegError("ffprobe reported no video stream".to_string()))
}

/// Parses `WIDTHxHEIGHT` as printed by `ffprobe -of csv=s=x:p=0`.
fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    let (w, h) = (w.trim().parse().ok()?, h.trim_end_matches('x').trim().parse().ok()?);
    (w > 0 && h > 0).then_some((w, h))
}

fn silent_ffmpeg() -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-hide_banner", "-nostats", "-nostdin"]);
    cmd
}

/// `ffmpeg -i video -i overlay -filter_complex [0:v][1:v]overlay=0:0`, re-encoded as H.264/AAC.
fn run_overlay(input: &Path, overlay: &Path, output: &Path) -> Result<()> {
    let mut cmd = silent_ffmpeg();
    cmd.arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-i")
        .arg(overlay)
        .args(["-filter_complex", "[0:v][1:v]overlay=0:0"])
        .args(["-c:v", "libx264", "-c:a", "aac", "-b:v", "2M", "-b:a", "128k"])
        .arg(output);

    let result = cmd
        .stdout(Stdio::null())
        .output()
        .map_err(|e| PortadaError::FfmpegError(format!("failed to spawn ffmpeg: {}", e)))?;

    if result.status.success() {
        Ok(())
    } else {
        Err(PortadaError::FfmpegError(format!(
            "exit code {}: {}",
            result.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&result.stderr).trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([30, 60, 90, 255]));
        encode(&img, crate::config::OutputFormat::Png).unwrap()
    }

    fn logo_settings(dir: &TempDir) -> Settings {
        let logo_path = dir.path().join("logo.png");
        RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])).save(&logo_path).unwrap();
        Settings::from_value(json!({ "logo": { "logo_file": logo_path, "logo_position": "top-left", "logo_margin": 0 } }))
    }

    #[test]
    fn test_suggested_filename_shape() {
        let name = suggested_filename("logo", "jpg");
        let parts: Vec<&str> = name.trim_end_matches(".jpg").split('-').collect();
        assert_eq!(parts[0], "logo");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
        assert_eq!(parts[3].len(), 6);
        assert!(parts[3].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1280x720\n"), Some((1280, 720)));
        assert_eq!(parse_dimensions("640x480x\n"), Some((640, 480)));
        assert_eq!(parse_dimensions(""), None);
        assert_eq!(parse_dimensions("N/AxN/A"), None);
        assert_eq!(parse_dimensions("0x0"), None);
    }

    #[test]
    fn test_image_logo_path() {
        let dir = TempDir::new().unwrap();
        let settings = logo_settings(&dir);
        let rendered = process_media(&png_bytes(100, 50), Some("Logo"), &settings).unwrap();

        assert_eq!(rendered.kind, MediaKind::Image);
        assert!(rendered.filename.starts_with("logo-"));
        assert!(rendered.filename.ends_with(".jpg"));
        assert_eq!(rendered.mime(), "image/jpeg");

        let decoded = image::load_from_memory(&rendered.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (100, 50));
        let px = decoded.get_pixel(3, 3);
        assert!(px[0] > 180 && px[1] < 90, "logo not drawn: {:?}", px);
    }

    #[test]
    fn test_png_output_extension() {
        let settings = Settings::from_value(json!({ "output": { "format": "PNG" } }));
        let rendered = process_media(&png_bytes(20, 20), None, &settings).unwrap();
        assert!(rendered.filename.starts_with("unknown-"));
        assert!(rendered.filename.ends_with(".png"));
        assert_eq!(rendered.mime(), "image/png");
    }

    #[test]
    fn test_missing_logo_is_an_error_for_images() {
        let settings = Settings::from_value(json!({ "logo": { "logo_file": "/nonexistent/logo.png" } }));
        let err = process_media(&png_bytes(20, 20), Some("logo"), &settings).unwrap_err();
        assert!(matches!(err, PortadaError::FileNotFound(_)));
    }

    #[test]
    fn test_recorte_without_edition_is_untouched() {
        let settings = Settings::new();
        let rendered = process_media(&png_bytes(40, 20), Some("recorte"), &settings).unwrap();
        assert!(rendered.filename.starts_with("recorte-"));
        let decoded = image::load_from_memory(&rendered.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }

    #[test]
    fn test_recorte_with_edition_reframes() {
        let settings = Settings::from_value(json!({ "mode": "recorte", "output": { "width": 30, "height": 40 } }));
        let editions = vec![EditionConfig::from_settings("recorte", &settings)];
        let rendered =
            process_media_with_editions(&png_bytes(100, 50), Some("recorte"), &Settings::new(), &editions).unwrap();
        let decoded = image::load_from_memory(&rendered.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 40));
    }

    #[test]
    fn test_video_overlay_logo_and_failures() {
        let dir = TempDir::new().unwrap();
        let settings = logo_settings(&dir);

        let overlay = video_overlay(200, 100, &Effect::Logo, &settings);
        assert_eq!(overlay.dimensions(), (200, 100));
        assert_eq!(overlay.get_pixel(2, 2), &Rgba([255, 0, 0, 255]));
        assert_eq!(overlay.get_pixel(150, 80)[3], 0);

        let broken = Settings::from_value(json!({ "watermark": { "watermark_file": "/nonexistent.png" } }));
        let overlay = video_overlay(50, 50, &Effect::Watermark, &broken);
        assert!(overlay.pixels().all(|p| p[3] == 0));

        let overlay = video_overlay(50, 50, &Effect::Blur, &settings);
        assert!(overlay.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_video_overlay_text() {
        let settings = Settings::from_value(json!({ "bigtext": { "font": "/nonexistent/Impact.ttf", "size": 40 } }));
        let effect = classify(Some("big Hola"));
        let overlay = video_overlay(400, 200, &effect, &settings);
        assert!(overlay.pixels().any(|p| p[3] > 0));
    }

    #[test]
    fn test_video_without_ffmpeg_returns_original() {
        let dir = TempDir::new().unwrap();
        let settings = logo_settings(&dir);
        // Valid signature, garbage body: ffmpeg (if present) cannot decode it.
        let mut video = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom".to_vec();
        video.extend_from_slice(&[0u8; 64]);

        let rendered = process_media(&video, Some("logo"), &settings).unwrap();
        assert_eq!(rendered.kind, MediaKind::Video);
        assert_eq!(rendered.filename, ORIGINAL_VIDEO_NAME);
        assert_eq!(rendered.bytes, video);
        assert_eq!(rendered.mime(), "video/mp4");
    }
}

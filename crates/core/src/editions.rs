//! Templated renditions ("editions") of a news link.
//!
//! An edition is a JSON file merged over the base settings. It picks how the
//! lead image is framed on the output canvas (`recorte` crops, `blur` fills
//! with a blurred copy), which darkening filters run, and where the headline
//! and category tag go. Every `*.json` in the editions directory is one
//! edition, named after its file stem.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::{OutputConfig, OutputFormat, Settings};
use crate::processors::text_render::{self, CategoryStyle, TitleStyle};
use crate::processors::typeface::Typeface;
use crate::processors::{crop, encode, filters};
use crate::universal::unique_suffix;
use crate::{PortadaError, Result};

/// Title used when a link has no usable title.
pub const UNTITLED: &str = "Sin título";

/// Variant name of the edition built from the base settings alone.
pub const DEFAULT_VARIANT: &str = "default";

/// Border colour of the category tag when none (or an invalid one) is configured.
pub const CATEGORY_ORANGE: Rgba<u8> = Rgba([0xFF, 0x60, 0x00, 255]);

/// How the lead image fills the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Crop to the output aspect ratio, then resize.
    Crop,
    /// Letterbox over a blurred, stretched copy.
    Blur,
    /// Stretch to the output size.
    Stretch,
}

impl Framing {
    pub fn from_mode(mode: &str) -> Self {
        match mode.to_lowercase().as_str() {
            "recorte" => Self::Crop,
            "blur" => Self::Blur,
            _ => Self::Stretch,
        }
    }
}

/// Headline and category layout of an edition (`text` section).
///
/// Fonts and sizes have no defaults: an edition without them cannot render text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub title_font: Option<PathBuf>,
    pub title_size: Option<f32>,
    pub tracking: i32,
    pub max_width_ratio: f32,
    pub max_lines: usize,
    pub title_x: i32,
    pub title_y: i32,
    pub line_spacing: i32,
    pub shadow_opacity: f32,
    pub category_font: Option<PathBuf>,
    pub category_size: Option<f32>,
    pub category_padding: i32,
    pub category_border_color: String,
    pub border_thickness: u32,
    pub category_x: i32,
    pub category_y: i32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            title_font: None,
            title_size: None,
            tracking: -25,
            max_width_ratio: 0.85,
            max_lines: 3,
            title_x: 50,
            title_y: 700,
            line_spacing: 96,
            shadow_opacity: 0.5,
            category_font: None,
            category_size: None,
            category_padding: 30,
            category_border_color: "#FF6000".to_string(),
            border_thickness: 4,
            category_x: 50,
            category_y: 650,
        }
    }
}

/// `blur` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    pub radius: f32,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self { radius: 25.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VignetteConfig {
    pub intensity: f32,
}

impl Default for VignetteConfig {
    fn default() -> Self {
        Self { intensity: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BottomShadowConfig {
    pub intensity: f32,
    pub height_ratio: f32,
}

impl Default for BottomShadowConfig {
    fn default() -> Self {
        Self { intensity: 0.5, height_ratio: 0.4 }
    }
}

/// `filters` section; absent filters are skipped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    pub vignette: Option<VignetteConfig>,
    pub bottom_shadow: Option<BottomShadowConfig>,
}

/// One fully merged edition.
#[derive(Debug, Clone, PartialEq)]
pub struct EditionConfig {
    pub variant: String,
    pub mode: String,
    pub text: TextConfig,
    pub output: OutputConfig,
    pub blur: BlurConfig,
    pub filters: FiltersConfig,
    pub path: Option<PathBuf>,
}

impl EditionConfig {
    /// Reads the edition keys out of merged settings. `mode` defaults to `recorte`.
    pub fn from_settings(variant: impl Into<String>, settings: &Settings) -> Self {
        let mode = settings
            .get("mode")
            .and_then(|v| v.as_str())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("recorte")
            .to_string();

        Self {
            variant: variant.into(),
            mode,
            text: settings.section("text"),
            output: settings.section("output"),
            blur: settings.section("blur"),
            filters: settings.section("filters"),
            path: None,
        }
    }

    pub fn framing(&self) -> Framing {
        Framing::from_mode(&self.mode)
    }

    /// Case-insensitive match of `effect` against `mode`.
    pub fn matches(&self, effect: &str) -> bool {
        self.mode.eq_ignore_ascii_case(effect.trim())
    }
}

/// Loads every `*.json` in `dir`, sorted by path, merged over `settings`.
///
/// A missing directory yields no editions; unreadable files are logged and skipped.
pub fn load_editions(settings: &Settings, dir: &Path) -> Vec<EditionConfig> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "no editions directory");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| {
            let variant = path.file_stem()?.to_string_lossy().into_owned();
            match settings.with_override(&path) {
                Ok(merged) => {
                    let mut edition = EditionConfig::from_settings(variant, &merged);
                    edition.path = Some(path);
                    Some(edition)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load edition");
                    None
                }
            }
        })
        .collect()
}

/// Editions to render for a link: those in `dir` (or a single default built
/// from `settings`), filtered by `effect` when given.
pub fn select_editions(settings: &Settings, dir: &Path, effect: Option<&str>) -> Result<Vec<EditionConfig>> {
    let mut editions = load_editions(settings, dir);
    if editions.is_empty() {
        editions.push(EditionConfig::from_settings(DEFAULT_VARIANT, settings));
    }

    match effect.map(str::trim).filter(|e| !e.is_empty()) {
        None => Ok(editions),
        Some(effect) => {
            let matching: Vec<EditionConfig> = editions.into_iter().filter(|e| e.matches(effect)).collect();
            if matching.is_empty() { Err(PortadaError::UnknownEffect(effect.to_string())) } else { Ok(matching) }
        }
    }
}

/// First edition whose mode matches `effect`, if any.
pub fn find_edition<'a>(editions: &'a [EditionConfig], effect: &str) -> Option<&'a EditionConfig> {
    editions.iter().find(|e| e.matches(effect))
}

/// Fits `base` onto the edition canvas.
pub fn frame(base: &RgbaImage, edition: &EditionConfig) -> RgbaImage {
    let (w, h) = (edition.output.width.max(1), edition.output.height.max(1));
    match edition.framing() {
        Framing::Blur => filters::blurred_background(base, (w, h), edition.blur.radius),
        Framing::Crop => {
            let cropped = crop::crop_center_aspect(base, w as f32 / h as f32);
            imageops::resize(&cropped, w, h, FilterType::Lanczos3)
        }
        Framing::Stretch => imageops::resize(base, w, h, FilterType::Lanczos3),
    }
}

/// Runs the configured vignette and bottom shadow, in that order.
pub fn apply_filters(canvas: RgbaImage, config: &FiltersConfig) -> RgbaImage {
    let mut canvas = canvas;
    if let Some(vignette) = &config.vignette {
        canvas = filters::apply_vignette(&canvas, vignette.intensity);
    }
    if let Some(shadow) = &config.bottom_shadow {
        canvas = filters::apply_bottom_shadow(&canvas, shadow.intensity, shadow.height_ratio);
    }
    canvas
}

/// Frames and filters `base` without any text.
pub fn reframe(base: &RgbaImage, edition: &EditionConfig) -> RgbaImage {
    apply_filters(frame(base, edition), &edition.filters)
}

fn required<T: Clone>(value: &Option<T>, key: &str, edition: &EditionConfig) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| PortadaError::ConfigError(format!("edition `{}` is missing text.{}", edition.variant, key)))
}

/// Renders one edition: frame, filters, headline and category tag.
pub fn render_edition(base: &RgbaImage, title: &str, category: &str, edition: &EditionConfig) -> Result<RgbaImage> {
    let text = &edition.text;
    let title_font = required(&text.title_font, "title_font", edition)?;
    let title_size = required(&text.title_size, "title_size", edition)?;
    let category_font = required(&text.category_font, "category_font", edition)?;
    let category_size = required(&text.category_size, "category_size", edition)?;

    let mut canvas = reframe(base, edition);

    let title_face = Typeface::load(&title_font)?;
    let max_width = (canvas.width() as f32 * text.max_width_ratio) as u32;
    let lines = text_render::title_lines(title, max_width, text.max_lines, |line| {
        title_face.tracked_width(line, title_size, text.tracking)
    });
    let title_style = TitleStyle {
        size: title_size,
        tracking: text.tracking,
        x: text.title_x,
        y: text.title_y,
        line_spacing: text.line_spacing,
        shadow_offset: (2, 2),
        shadow_opacity: text.shadow_opacity,
    };
    text_render::draw_title_lines(&mut canvas, &lines, &title_face, &title_style);

    let category_face = if category_font == title_font { title_face } else { Typeface::load(&category_font)? };
    let border_color = text_render::parse_hex_color(&text.category_border_color).unwrap_or_else(|| {
        warn!(color = %text.category_border_color, "invalid category border colour, using orange");
        CATEGORY_ORANGE
    });
    let category_style = CategoryStyle {
        size: category_size,
        padding: text.category_padding,
        border_color,
        border_thickness: text.border_thickness,
        shadow_offset: (2, 2),
        x: text.category_x,
        y: text.category_y,
    };
    text_render::draw_category(&mut canvas, category, &category_face, &category_style);

    Ok(canvas)
}

/// An encoded edition ready to write or send.
#[derive(Debug, Clone)]
pub struct Rendition {
    pub variant: String,
    pub bytes: Vec<u8>,
    pub filename: String,
    pub format: OutputFormat,
}

/// Everything needed to render editions of one link.
#[derive(Debug, Clone)]
pub struct LinkSource {
    pub url: String,
    pub title: String,
    pub category: String,
    pub image: RgbaImage,
}

/// Renders and encodes every edition, logging and skipping those that fail.
pub fn render_editions(source: &LinkSource, editions: &[EditionConfig]) -> Vec<Rendition> {
    editions
        .iter()
        .filter_map(|edition| {
            let rendered = render_edition(&source.image, &source.title, &source.category, edition)
                .and_then(|canvas| encode(&canvas, edition.output.format));
            match rendered {
                Ok(bytes) => {
                    let format = edition.output.format;
                    let filename = format!("{}-{}.{}", edition.variant, unique_suffix(), format.extension());
                    info!(variant = %edition.variant, %filename, size = bytes.len(), "rendered edition");
                    Some(Rendition { variant: edition.variant.clone(), bytes, filename, format })
                }
                Err(e) => {
                    error!(variant = %edition.variant, error = %e, "failed to render edition");
                    None
                }
            }
        })
        .collect()
}

#[cfg(feature = "fetch")]
mod link_pipeline {
    use super::*;
    use crate::config::SourceConfig;
    use crate::fetch::{FetchConfig, fetch_bytes};
    use crate::link::scrape;
    use crate::processors::decode_oriented;

    /// Scrapes `url` and downloads its lead image.
    ///
    /// Fails when the page could not be fetched or exposes no `og:image`.
    pub async fn fetch_link_source(url: &str, settings: &Settings, fetch: &FetchConfig) -> Result<LinkSource> {
        let source_config: SourceConfig = settings.root();
        let metadata = scrape(url, &source_config, fetch).await;
        if let Some(message) = metadata.error {
            return Err(PortadaError::ScrapeError(message));
        }

        let image_url = metadata.image_url.ok_or(PortadaError::MissingImage)?;
        let title = metadata.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| UNTITLED.to_string());

        let bytes = fetch_bytes(&image_url, fetch).await?;
        let image = decode_oriented(&bytes)?;
        debug!(%image_url, width = image.width(), height = image.height(), "downloaded lead image");

        Ok(LinkSource { url: url.to_string(), title, category: metadata.category, image })
    }

    /// Renders every edition of `url`, optionally only those whose mode is `effect`.
    pub async fn generate_all_from_link(
        url: &str,
        settings: &Settings,
        editions_dir: &Path,
        effect: Option<&str>,
        fetch: &FetchConfig,
    ) -> Result<Vec<Rendition>> {
        info!(url, ?effect, "generating editions for link");
        let source = fetch_link_source(url, settings, fetch).await?;
        let editions = select_editions(settings, editions_dir, effect)?;
        Ok(render_editions(&source, &editions))
    }

    /// Renders the editions of `url` and returns the first one.
    pub async fn generate_from_link(
        url: &str,
        settings: &Settings,
        editions_dir: &Path,
        fetch: &FetchConfig,
    ) -> Result<Rendition> {
        generate_all_from_link(url, settings, editions_dir, None, fetch)
            .await?
            .into_iter()
            .next()
            .ok_or(PortadaError::NoRenditions)
    }
}

#[cfg(feature = "fetch")]
pub use link_pipeline::{fetch_link_source, generate_all_from_link, generate_from_link};

//! Font loading, measurement and glyph drawing.
//!
//! Sizes are em sizes in pixels, the way desktop image libraries size fonts,
//! and text is positioned by the top of its ascender line.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::{PortadaError, Result};

/// Last-resort face compiled into the binary.
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Reported as the source of [`Typeface::embedded`].
pub const EMBEDDED_FONT_NAME: &str = "<embedded>/DejaVuSans-Bold.ttf";

/// Fonts tried, in order, when the configured font cannot be read.
const FALLBACK_FONTS: [&str; 9] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Ink bounds of a run of text, relative to its drawing origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkBounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl InkBounds {
    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0.0).round() as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0.0).round() as u32
    }

    fn union(self, other: InkBounds) -> InkBounds {
        InkBounds {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// A loaded TrueType/OpenType font.
pub struct Typeface {
    font: FontVec,
    source: PathBuf,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeface").field("source", &self.source).finish()
    }
}

impl Typeface {
    /// Loads `path`, falling back to well-known system fonts and then to the
    /// embedded face.
    pub fn load(path: &Path) -> Result<Self> {
        match Self::from_file(path) {
            Ok(face) => Ok(face),
            Err(e) => {
                warn!(font = %path.display(), error = %e, "could not load font, trying fallbacks");
                match Self::fallback(path) {
                    Some(face) => Ok(face),
                    None => {
                        debug!("no system font found, using embedded face");
                        Self::embedded()
                    }
                }
            }
        }
    }

    /// The face bundled with the crate.
    pub fn embedded() -> Result<Self> {
        let font = FontVec::try_from_vec(EMBEDDED_FONT.to_vec())
            .map_err(|e| PortadaError::FontError(format!("{}: {}", EMBEDDED_FONT_NAME, e)))?;
        Ok(Self { font, source: PathBuf::from(EMBEDDED_FONT_NAME) })
    }

    /// Loads exactly the font at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PortadaError::FileNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| PortadaError::FontError(format!("{}: {}", path.display(), e)))?;
        Ok(Self { font, source: path.to_path_buf() })
    }

    fn fallback(requested: &Path) -> Option<Self> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(font_dir) = dirs::font_dir()
            && let Some(name) = requested.file_name()
        {
            candidates.push(font_dir.join(name));
        }
        candidates.extend(FALLBACK_FONTS.iter().map(PathBuf::from));

        candidates.iter().filter(|p| p.exists()).find_map(|p| match Self::from_file(p) {
            Ok(face) => {
                debug!(font = %p.display(), "using fallback font");
                Some(face)
            }
            Err(_) => None,
        })
    }

    /// Path the font was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Converts an em size in pixels into the scale ab_glyph expects.
    fn scale(&self, size: f32) -> PxScale {
        let units_per_em = self.font.units_per_em().unwrap_or(1000.0);
        PxScale::from(size * self.font.height_unscaled() / units_per_em)
    }

    fn glyph_bounds(&self, id: GlyphId, size: f32, x: f32) -> Option<InkBounds> {
        let scale = self.scale(size);
        let ascent = self.font.as_scaled(scale).ascent();
        let glyph = id.with_scale_and_position(scale, point(x, ascent));
        self.font.outline_glyph(glyph).map(|outlined| {
            let rect = outlined.px_bounds();
            InkBounds { left: rect.min.x, top: rect.min.y, right: rect.max.x, bottom: rect.max.y }
        })
    }

    /// Lays out `text` on one line, returning glyphs with their x offsets.
    fn layout(&self, text: &str, size: f32) -> Vec<(GlyphId, f32)> {
        let scaled = self.font.as_scaled(self.scale(size));
        let mut caret = 0.0;
        let mut previous: Option<GlyphId> = None;
        let mut glyphs = Vec::with_capacity(text.len());

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push((id, caret));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
        glyphs
    }

    /// Ink bounds of `text` drawn at the origin, or `None` when nothing is inked.
    pub fn ink_bounds(&self, text: &str, size: f32) -> Option<InkBounds> {
        self.layout(text, size)
            .into_iter()
            .filter_map(|(id, x)| self.glyph_bounds(id, size, x))
            .reduce(InkBounds::union)
    }

    /// Width and height of the inked area of `text`.
    pub fn text_size(&self, text: &str, size: f32) -> (u32, u32) {
        self.ink_bounds(text, size).map_or((0, 0), |b| (b.width(), b.height()))
    }

    /// Horizontal advance of a space.
    pub fn space_width(&self, size: f32) -> u32 {
        let scaled = self.font.as_scaled(self.scale(size));
        scaled.h_advance(scaled.glyph_id(' ')).round() as u32
    }

    /// Ink width of a single character; spaces and blank glyphs use their advance.
    pub fn char_width(&self, c: char, size: f32) -> u32 {
        if c == ' ' {
            return self.space_width(size);
        }
        let scaled = self.font.as_scaled(self.scale(size));
        let id = scaled.glyph_id(c);
        match self.glyph_bounds(id, size, 0.0) {
            Some(bounds) => bounds.width(),
            None => scaled.h_advance(id).round() as u32,
        }
    }

    /// Width of `text` when every non-space character advances by its ink width plus `tracking`.
    pub fn tracked_width(&self, text: &str, size: f32, tracking: i32) -> u32 {
        text.chars()
            .map(|c| if c == ' ' { self.space_width(size) as i64 } else { tracked_advance(self.char_width(c, size), tracking) })
            .sum::<i64>()
            .max(0) as u32
    }

    /// Draws `text` with its ascender line at `y`.
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, x: i32, y: i32, size: f32, color: Rgba<u8>) {
        for (id, offset) in self.layout(text, size) {
            self.draw_glyph(canvas, id, size, x as f32 + offset, y as f32, color);
        }
    }

    /// Draws `text` one character at a time, advancing by ink width plus `tracking`.
    pub fn draw_tracked(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: i32,
        y: i32,
        size: f32,
        tracking: i32,
        color: Rgba<u8>,
    ) {
        let scaled = self.font.as_scaled(self.scale(size));
        let mut caret = x as i64;
        for c in text.chars() {
            if c == ' ' {
                caret += self.space_width(size) as i64;
                continue;
            }
            self.draw_glyph(canvas, scaled.glyph_id(c), size, caret as f32, y as f32, color);
            caret += tracked_advance(self.char_width(c, size), tracking);
        }
    }

    fn draw_glyph(&self, canvas: &mut RgbaImage, id: GlyphId, size: f32, x: f32, y: f32, color: Rgba<u8>) {
        let scale = self.scale(size);
        let ascent = self.font.as_scaled(scale).ascent();
        let glyph = id.with_scale_and_position(scale, point(x, y + ascent));

        if let Some(outlined) = self.font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            let (left, top) = (bounds.min.x as i64, bounds.min.y as i64);
            outlined.draw(|gx, gy, coverage| {
                blend_pixel(canvas, left + gx as i64, top + gy as i64, color, coverage);
            });
        }
    }
}

fn tracked_advance(ink_width: u32, tracking: i32) -> i64 {
    (ink_width as i64 + tracking as i64).max(1)
}

/// Source-over blends `color` at `coverage` into the pixel at (`x`, `y`).
pub fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let src_a = coverage.clamp(0.0, 1.0) * (color[3] as f32 / 255.0);
    if src_a <= 0.0 {
        return;
    }

    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    for channel in 0..3 {
        let src = color[channel] as f32;
        let below = dst[channel] as f32;
        let value = (src * src_a + below * dst_a * (1.0 - src_a)) / out_a;
        dst[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Fills the axis-aligned rectangle `[x0, x1) × [y0, y1)`, clipped to the canvas.
pub fn fill_rect(canvas: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
    for y in y0.max(0)..y1.min(canvas.height() as i64) {
        for x in x0.max(0)..x1.min(canvas.width() as i64) {
            blend_pixel(canvas, x, y, color, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_opaque_replaces() {
        let mut canvas = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        blend_pixel(&mut canvas, 0, 0, Rgba([200, 100, 50, 255]), 1.0);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([200, 100, 50, 255]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_blend_half_alpha_on_opaque() {
        let mut canvas = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        blend_pixel(&mut canvas, 0, 0, Rgba([0, 0, 0, 128]), 1.0);
        let px = canvas.get_pixel(0, 0);
        assert_eq!(px[3], 255);
        assert!((px[0] as i32 - 127).abs() <= 1);
    }

    #[test]
    fn test_blend_on_transparent_keeps_color() {
        let mut canvas = RgbaImage::new(1, 1);
        blend_pixel(&mut canvas, 0, 0, Rgba([255, 0, 0, 255]), 0.5);
        let px = canvas.get_pixel(0, 0);
        assert_eq!(px[0], 255);
        assert!((px[3] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_blend_out_of_bounds_is_ignored() {
        let mut canvas = RgbaImage::new(1, 1);
        blend_pixel(&mut canvas, -1, 0, Rgba([255, 0, 0, 255]), 1.0);
        blend_pixel(&mut canvas, 0, 5, Rgba([255, 0, 0, 255]), 1.0);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = RgbaImage::new(4, 4);
        fill_rect(&mut canvas, -2, 1, 2, 10, Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(0, 1)[1], 255);
        assert_eq!(canvas.get_pixel(1, 3)[1], 255);
        assert_eq!(canvas.get_pixel(2, 1)[1], 0);
        assert_eq!(canvas.get_pixel(0, 0)[1], 0);
    }

    #[test]
    fn test_tracked_advance_never_below_one() {
        assert_eq!(tracked_advance(10, -25), 1);
        assert_eq!(tracked_advance(30, -5), 25);
    }

    #[test]
    fn test_missing_font_file() {
        let result = Typeface::from_file(Path::new("/nonexistent/font.ttf"));
        assert!(matches!(result, Err(PortadaError::FileNotFound(_))));
    }

    #[test]
    fn test_embedded_font_loads() {
        let face = Typeface::embedded().unwrap();
        assert_eq!(face.source(), Path::new(EMBEDDED_FONT_NAME));
    }

    #[test]
    fn test_missing_font_falls_back() {
        let face = Typeface::load(Path::new("/nonexistent/Impact.ttf")).unwrap();
        assert_ne!(face.source(), Path::new("/nonexistent/Impact.ttf"));
        assert!(face.text_size("A", 40.0).0 > 0);
    }

    #[test]
    fn test_font_measurements() {
        let face = Typeface::embedded().unwrap();
        let (w_short, h) = face.text_size("AB", 40.0);
        let (w_long, _) = face.text_size("ABAB", 40.0);
        assert!(w_short > 0 && h > 0);
        assert!(w_long > w_short);
        assert!(face.tracked_width("ABAB", 40.0, -5) < face.tracked_width("ABAB", 40.0, 0));
        assert_eq!(face.text_size("   ", 40.0), (0, 0));
    }

    #[test]
    fn test_font_draws_pixels() {
        let face = Typeface::embedded().unwrap();
        let mut canvas = RgbaImage::new(120, 60);
        face.draw(&mut canvas, "Hi", 5, 5, 40.0, Rgba([255, 255, 255, 255]));
        assert!(canvas.pixels().any(|p| p[3] > 0));
    }
}

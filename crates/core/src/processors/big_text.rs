//! Large centered caption text with an outline.

use image::{Rgba, RgbaImage};
use tracing::debug;

use super::typeface::Typeface;
use crate::Result;
use crate::config::{Align, BigTextConfig};

/// Renders `text` over `img` with the font named in `config`.
pub fn apply(img: &RgbaImage, text: &str, config: &BigTextConfig) -> Result<RgbaImage> {
    let face = Typeface::load(&config.font)?;
    Ok(apply_with_face(img, text, config, &face))
}

/// Renders `text` over `img` with an already loaded font.
///
/// Lines are wrapped to `max_width_ratio` of the image width and the block is
/// centered vertically between the top and bottom margins.
pub fn apply_with_face(img: &RgbaImage, text: &str, config: &BigTextConfig, face: &Typeface) -> RgbaImage {
    let mut out = img.clone();
    let size = config.size;
    let max_width = (img.width() as f32 * config.max_width_ratio) as u32;
    let lines = wrap_words(text.trim(), max_width, |line| face.text_size(line, size).0);
    if lines.is_empty() {
        return out;
    }

    let sizes: Vec<(u32, u32)> = lines.iter().map(|line| face.text_size(line, size)).collect();
    let spacing = config.line_spacing as i64;
    let total_h = sizes.iter().map(|(_, h)| *h as i64 + spacing).sum::<i64>() - spacing;

    let (w, h) = (img.width() as i64, img.height() as i64);
    let (margin_x, margin_y) = (config.margin_x as i64, config.margin_y as i64);
    let mut y = margin_y + (h - 2 * margin_y - total_h).div_euclid(2);
    debug!(lines = lines.len(), total_h, "drawing big text");

    let fill = rgb(config.color);
    let stroke = rgb(config.stroke_color);
    for (line, (line_w, line_h)) in lines.iter().zip(&sizes) {
        let x = match config.align {
            Align::Center => (w - *line_w as i64).div_euclid(2),
            Align::Right => w - margin_x - *line_w as i64,
            Align::Left => margin_x,
        };
        draw_outlined(&mut out, face, line, (x as i32, y as i32), size, config.stroke_width, fill, stroke);
        y += *line_h as i64 + spacing;
    }
    out
}

/// Greedy word wrap: each line takes words while `measure` stays within `max_width`.
///
/// A single word wider than the limit stays on a line by itself.
pub fn wrap_words<F>(text: &str, max_width: u32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> u32,
{
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = first.to_string();
    for word in words {
        let candidate = format!("{} {}", current, word);
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    lines.push(current);
    lines
}

/// Draws the outline by stamping the text at every offset within `stroke_width`, then the fill.
#[allow(clippy::too_many_arguments)]
fn draw_outlined(
    canvas: &mut RgbaImage,
    face: &Typeface,
    text: &str,
    origin: (i32, i32),
    size: f32,
    stroke_width: u32,
    fill: Rgba<u8>,
    stroke: Rgba<u8>,
) {
    let (x, y) = origin;
    let r = stroke_width as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx != 0 || dy != 0) && dx * dx + dy * dy <= r * r {
                face.draw(canvas, text, x + dx, y + dy, size, stroke);
            }
        }
    }
    face.draw(canvas, text, x, y, size, fill);
}

fn rgb(color: [u8; 3]) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(text: &str) -> u32 {
        text.chars().count() as u32
    }

    #[test]
    fn test_wrap_words_greedy() {
        let lines = wrap_words("uno dos tres cuatro", 8, chars);
        assert_eq!(lines, vec!["uno dos", "tres", "cuatro"]);
    }

    #[test]
    fn test_wrap_words_long_word_alone() {
        let lines = wrap_words("a larguísimo b", 3, chars);
        assert_eq!(lines, vec!["a", "larguísimo", "b"]);
    }

    #[test]
    fn test_wrap_words_collapses_whitespace() {
        assert_eq!(wrap_words("  hola \n mundo ", 100, chars), vec!["hola mundo"]);
        assert!(wrap_words("   ", 100, chars).is_empty());
    }

    #[test]
    fn test_empty_text_leaves_image_untouched() {
        let face = Typeface::embedded().unwrap();
        let img = RgbaImage::from_pixel(50, 50, Rgba([1, 2, 3, 255]));
        assert_eq!(apply_with_face(&img, "   ", &BigTextConfig::default(), &face), img);
    }

    #[test]
    fn test_big_text_draws_centered_fill_and_stroke() {
        let face = Typeface::embedded().unwrap();
        let img = RgbaImage::from_pixel(600, 400, Rgba([0, 0, 255, 255]));
        let config = BigTextConfig { size: 80.0, ..BigTextConfig::default() };
        let out = apply_with_face(&img, "HOLA", &config, &face);

        assert!(out.pixels().any(|p| p[0] == 255 && p[1] == 255 && p[2] == 255));
        assert!(out.pixels().any(|p| p[0] == 0 && p[1] == 0 && p[2] == 0));
        // Corners stay clear of a centered block.
        assert_eq!(out.get_pixel(2, 2), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(597, 397), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_left_alignment_respects_margin() {
        let face = Typeface::embedded().unwrap();
        let img = RgbaImage::from_pixel(600, 300, Rgba([0, 0, 255, 255]));
        let config = BigTextConfig { size: 60.0, align: Align::Left, margin_x: 100, stroke_width: 0, ..BigTextConfig::default() };
        let out = apply_with_face(&img, "HI", &config, &face);

        for y in 0..300 {
            for x in 0..95 {
                assert_eq!(out.get_pixel(x, y), &Rgba([0, 0, 255, 255]), "pixel ({x}, {y}) was drawn on");
            }
        }
    }
}

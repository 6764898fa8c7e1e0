//! Headline and category rendering for link editions.

use image::{Rgba, RgbaImage};

use super::typeface::{Typeface, fill_rect};

/// Appended to a truncated last title line.
const ELLIPSIS: &str = "...";

/// Placement and styling of the headline block.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleStyle {
    pub size: f32,
    pub tracking: i32,
    pub x: i32,
    pub y: i32,
    pub line_spacing: i32,
    pub shadow_offset: (i32, i32),
    pub shadow_opacity: f32,
}

/// Placement and styling of the category tag.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStyle {
    pub size: f32,
    pub padding: i32,
    pub border_color: Rgba<u8>,
    pub border_thickness: u32,
    pub shadow_offset: (i32, i32),
    pub x: i32,
    pub y: i32,
}

/// Splits an uppercased title into at most `max_lines` lines no wider than `max_width`.
///
/// Words are packed greedily into the first `max_lines - 1` lines. A word wider
/// than the limit gets a line of its own. Whatever remains goes on the last
/// line, truncated with an ellipsis when it does not fit. A title that ends
/// early is followed by one empty line.
pub fn title_lines<F>(title: &str, max_width: u32, max_lines: usize, measure: F) -> Vec<String>
where
    F: Fn(&str) -> u32,
{
    let upper = title.to_uppercase();
    let words: Vec<&str> = upper.split_whitespace().collect();
    let max_lines = max_lines.max(1);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut index = 0;

    while index < words.len() && lines.len() < max_lines - 1 {
        let word = words[index];
        let candidate = if current.is_empty() { word.to_string() } else { format!("{} {}", current, word) };

        if measure(&candidate) <= max_width {
            current = candidate;
            index += 1;
        } else {
            if current.is_empty() {
                lines.push(word.to_string());
                index += 1;
            } else {
                lines.push(std::mem::take(&mut current));
            }
            current.clear();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let remaining = &words[index.min(words.len())..];
    let last_line = remaining.join(" ");

    if lines.len() == max_lines - 1 {
        if measure(&last_line) <= max_width {
            lines.push(last_line);
        } else {
            lines.push(truncate_words(remaining, max_width, &measure).unwrap_or(last_line));
        }
    } else if lines.len() < max_lines {
        lines.push(String::new());
    }

    lines
}

/// Longest prefix of `words` that still fits with an ellipsis appended.
fn truncate_words<F>(words: &[&str], max_width: u32, measure: &F) -> Option<String>
where
    F: Fn(&str) -> u32,
{
    (0..words.len()).find_map(|i| {
        let candidate = format!("{}{}", words[..=i].join(" "), ELLIPSIS);
        if measure(&candidate) > max_width { Some(format!("{}{}", words[..i].join(" "), ELLIPSIS)) } else { None }
    })
}

/// Draws headline lines: a translucent black shadow pass, then white text.
pub fn draw_title_lines(canvas: &mut RgbaImage, lines: &[String], face: &Typeface, style: &TitleStyle) {
    let shadow_alpha = (255.0 * style.shadow_opacity.clamp(0.0, 1.0)).round() as u8;
    let shadow = Rgba([0, 0, 0, shadow_alpha]);
    let white = Rgba([255, 255, 255, 255]);
    let cap_top = face.ink_bounds("A", style.size).map_or(0.0, |b| b.top);

    let mut y = style.y;
    for line in lines {
        let (dx, dy) = style.shadow_offset;
        face.draw_tracked(canvas, line, style.x + dx, y + dy, style.size, style.tracking, shadow);
        face.draw_tracked(canvas, line, style.x, y, style.size, style.tracking, white);

        let bottom = face.ink_bounds(line, style.size).map_or(0.0, |b| b.bottom);
        y += (bottom - cap_top).round() as i32 + style.line_spacing;
    }
}

/// Draws the uppercased category with a shadow and an L-shaped border.
///
/// The border runs along the bottom and the right of the text box, offset by
/// `padding`.
pub fn draw_category(canvas: &mut RgbaImage, category: &str, face: &Typeface, style: &CategoryStyle) {
    let text = category.to_uppercase();
    let (text_w, text_h) = face.text_size(&text, style.size);
    let (dx, dy) = style.shadow_offset;

    face.draw(canvas, &text, style.x + dx, style.y + dy, style.size, Rgba([0, 0, 0, 255]));
    face.draw(canvas, &text, style.x, style.y, style.size, Rgba([255, 255, 255, 255]));

    let x = style.x as i64;
    let y = style.y as i64;
    let corner_x = x + text_w as i64 + style.padding as i64;
    let corner_y = y + text_h as i64 + style.padding as i64;
    let half = style.border_thickness as i64 / 2;
    let thickness = style.border_thickness as i64;

    fill_rect(canvas, x, corner_y - half, corner_x + half, corner_y - half + thickness, style.border_color);
    fill_rect(canvas, corner_x - half, y, corner_x - half + thickness, corner_y + half, style.border_color);
}

/// Parses `#RRGGBB` (or `RRGGBB`) into an opaque colour.
pub fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(Rgba([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255]))
}

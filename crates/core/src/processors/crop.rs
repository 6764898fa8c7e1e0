use image::RgbaImage;
use image::imageops;

/// Crops the largest centered region with the given width/height ratio.
///
/// Wider images lose their sides, taller images lose top and bottom.
pub fn crop_center_aspect(img: &RgbaImage, target_ratio: f32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || !target_ratio.is_finite() || target_ratio <= 0.0 {
        return img.clone();
    }

    let current_ratio = w as f32 / h as f32;
    if current_ratio > target_ratio {
        let new_width = ((h as f32 * target_ratio).round() as u32).clamp(1, w);
        let left = (w - new_width) / 2;
        imageops::crop_imm(img, left, 0, new_width, h).to_image()
    } else {
        let new_height = ((w as f32 / target_ratio).round() as u32).clamp(1, h);
        let top = (h - new_height) / 2;
        imageops::crop_imm(img, 0, top, w, new_height).to_image()
    }
}

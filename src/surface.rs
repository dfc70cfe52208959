use image::{Rgba, RgbaImage};

use crate::options::Color;

pub const FALLBACK_MESSAGE: &str = "Error generating QR code";

/// A drawable target owned by the caller: an image buffer, a browser canvas, ...
///
/// Drawing calls are infallible; anything that can fail has to happen
/// before the first call so a surface is never left half-drawn.
pub trait Surface {
    fn dimensions(&self) -> (u32, u32);

    /// Resizes and clears the surface.
    fn resize(&mut self, width: u32, height: u32);

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color);

    /// Draws `text` centered on (`cx`, `cy`).
    fn fill_text(&mut self, text: &str, cx: u32, cy: u32, color: Color);
}

/// Paints the failure placeholder: a `background` fill with a centered
/// error message in `foreground`.
pub fn draw_fallback(
    surface: &mut dyn Surface,
    width: u32,
    height: u32,
    foreground: Color,
    background: Color,
) {
    surface.resize(width, height);
    surface.fill_rect(0, 0, width, height, background);
    surface.fill_text(FALLBACK_MESSAGE, width / 2, height / 2, foreground);
}

/// In-memory surface backed by an `RgbaImage`.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        RasterSurface {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl Default for RasterSurface {
    /// Same as a fresh browser canvas.
    fn default() -> Self {
        RasterSurface::new(300, 150)
    }
}

impl Surface for RasterSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        let (w, h) = self.image.dimensions();
        let x_end = x.saturating_add(width).min(w);
        let y_end = y.saturating_add(height).min(h);
        let pixel = color.to_rgba();

        for py in y..y_end {
            for px in x..x_end {
                self.image.put_pixel(px, py, pixel);
            }
        }
    }

    fn fill_text(&mut self, text: &str, cx: u32, cy: u32, color: Color) {
        let (w, h) = self.image.dimensions();
        let chars = text.chars().count() as u32;
        if chars == 0 {
            return;
        }

        let advance = GLYPH_WIDTH + 1;
        let text_width = |scale: u32| (chars * advance - 1) * scale;
        // Double size when the whole line fits, otherwise draw at 1x and clip.
        let scale = if text_width(2) <= w { 2 } else { 1 };

        let left = cx as i64 - text_width(scale) as i64 / 2;
        let top = cy as i64 - (GLYPH_HEIGHT * scale) as i64 / 2;
        let pixel = color.to_rgba();

        for (i, ch) in text.chars().enumerate() {
            let Some(rows) = glyph(ch) else {
                continue;
            };
            let origin_x = left + (i as u32 * advance * scale) as i64;

            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let x0 = origin_x + (col * scale) as i64;
                    let y0 = top + (row as u32 * scale) as i64;
                    put_block(&mut self.image, x0, y0, scale, pixel, (w, h));
                }
            }
        }
    }
}

fn put_block(image: &mut RgbaImage, x0: i64, y0: i64, scale: u32, pixel: Rgba<u8>, bounds: (u32, u32)) {
    for dy in 0..scale as i64 {
        for dx in 0..scale as i64 {
            let (x, y) = (x0 + dx, y0 + dy);
            if x >= 0 && y >= 0 && x < bounds.0 as i64 && y < bounds.1 as i64 {
                image.put_pixel(x as u32, y as u32, pixel);
            }
        }
    }
}

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// 5x7 bitmap glyphs, one byte per row, low five bits used.
/// Letters are case-folded to uppercase; unknown characters render as blanks.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        _ => return None,
    };
    Some(rows)
}

use image::RgbaImage;
use qrcode::{Color as Module, QrCode};

use crate::error::{Error, Result};
use crate::options::{Color, ErrorCorrection, GenerationOptions};
use crate::surface::Surface;

/// Largest side length, in pixels, the encoder will allocate.
pub const MAX_PIXEL_SIZE: u32 = 8192;

/// Pixels per module when the requested size cannot fit one pixel per module.
const FALLBACK_MODULE_PIXELS: u32 = 4;

/// Everything the encoder needs besides the content itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    /// Target side length in pixels, quiet zone included.
    pub pixel_size: u32,
    /// Quiet zone width in modules.
    pub margin: u32,
    pub dark: Color,
    pub light: Color,
    pub error_correction: ErrorCorrection,
}

impl EncodeParams {
    pub fn from_options(options: &GenerationOptions, pixel_size: u32) -> Self {
        EncodeParams {
            pixel_size,
            margin: options.margin,
            dark: options.foreground,
            light: options.background,
            error_correction: options.error_correction,
        }
    }
}

/// The encoding capability shared by the preview, export and embed paths.
///
/// Implementations must be deterministic: the same content and params
/// always produce the same output. Empty content is rejected with
/// [`Error::EmptyContent`]; callers are expected to short-circuit first.
pub trait Encoder {
    fn encode_to_raster(&self, content: &str, params: &EncodeParams) -> Result<RgbaImage>;

    /// Returns a standalone SVG document.
    fn encode_to_vector(&self, content: &str, params: &EncodeParams) -> Result<String>;

    /// Draws onto `surface`, resizing it to the symbol size. On error the
    /// surface has not been touched.
    fn encode_to_surface(
        &self,
        surface: &mut dyn Surface,
        content: &str,
        params: &EncodeParams,
    ) -> Result<()>;
}

/// [`Encoder`] backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder;

impl Encoder for QrEncoder {
    fn encode_to_raster(&self, content: &str, params: &EncodeParams) -> Result<RgbaImage> {
        let matrix = ModuleMatrix::encode(content, params.error_correction)?;
        let layout = Layout::new(matrix.width, params.margin, params.pixel_size)?;

        let dark = params.dark.to_rgba();
        let light = params.light.to_rgba();
        let image = RgbaImage::from_fn(layout.size, layout.size, |x, y| {
            if matrix.is_dark_at(&layout, layout.module_at(x), layout.module_at(y)) {
                dark
            } else {
                light
            }
        });

        Ok(image)
    }

    fn encode_to_vector(&self, content: &str, params: &EncodeParams) -> Result<String> {
        let matrix = ModuleMatrix::encode(content, params.error_correction)?;
        let layout = Layout::new(matrix.width, params.margin, params.pixel_size)?;
        let total = layout.total;

        let mut path = String::new();
        for (y, x, len) in matrix.dark_runs() {
            path.push_str(&format!(
                "M{} {}h{}v1h-{}z",
                x + layout.margin,
                y + layout.margin,
                len,
                len
            ));
        }

        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" \
             viewBox=\"0 0 {total} {total}\" shape-rendering=\"crispEdges\">",
            size = layout.size,
        );
        svg.push_str(&format!(
            "<path fill=\"{}\" d=\"M0 0h{total}v{total}H0z\"/>",
            params.light.to_hex()
        ));
        if !path.is_empty() {
            svg.push_str(&format!(
                "<path fill=\"{}\" d=\"{}\"/>",
                params.dark.to_hex(),
                path
            ));
        }
        svg.push_str("</svg>\n");

        Ok(svg)
    }

    fn encode_to_surface(
        &self,
        surface: &mut dyn Surface,
        content: &str,
        params: &EncodeParams,
    ) -> Result<()> {
        let matrix = ModuleMatrix::encode(content, params.error_correction)?;
        let layout = Layout::new(matrix.width, params.margin, params.pixel_size)?;

        surface.resize(layout.size, layout.size);
        surface.fill_rect(0, 0, layout.size, layout.size, params.light);

        for (y, x, len) in matrix.dark_runs() {
            let (x0, _) = layout.span(x + layout.margin);
            let (_, x1) = layout.span(x + layout.margin + len - 1);
            let (y0, y1) = layout.span(y + layout.margin);
            surface.fill_rect(x0, y0, x1 - x0, y1 - y0, params.dark);
        }

        Ok(())
    }
}

/// The encoded symbol, without quiet zone.
#[derive(Debug, Clone)]
pub struct ModuleMatrix {
    width: u32,
    modules: Vec<Module>,
}

impl ModuleMatrix {
    pub fn encode(content: &str, level: ErrorCorrection) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::EmptyContent);
        }

        let code = QrCode::with_error_correction_level(content.as_bytes(), level.into())?;
        let width = code.width() as u32;
        log::debug!(
            "encoded {} byte(s) at level {} into {}x{} modules",
            content.len(),
            level,
            width,
            width
        );

        Ok(ModuleMatrix {
            width,
            modules: code.to_colors(),
        })
    }

    /// Symbol side length in modules.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.width
            && self.modules[(y * self.width + x) as usize] == Module::Dark
    }

    /// `x`/`y` are in quiet-zone coordinates.
    fn is_dark_at(&self, layout: &Layout, x: u32, y: u32) -> bool {
        match (x.checked_sub(layout.margin), y.checked_sub(layout.margin)) {
            (Some(mx), Some(my)) => self.is_dark(mx, my),
            _ => false,
        }
    }

    /// Horizontal runs of dark modules as `(row, first column, length)`.
    fn dark_runs(&self) -> Vec<(u32, u32, u32)> {
        let mut runs = Vec::new();
        for y in 0..self.width {
            let mut x = 0;
            while x < self.width {
                if !self.is_dark(x, y) {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < self.width && self.is_dark(x, y) {
                    x += 1;
                }
                runs.push((y, start, x - start));
            }
        }
        runs
    }
}

/// Maps pixels to modules for a symbol plus quiet zone stretched over
/// `size` pixels. Pixel `p` belongs to module `p * total / size`, so every
/// module is either `floor` or `ceil` of `size / total` pixels wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    margin: u32,
    /// Modules across, quiet zone included.
    total: u32,
    /// Pixels across.
    size: u32,
}

impl Layout {
    fn new(symbol_width: u32, margin: u32, pixel_size: u32) -> Result<Self> {
        let total = symbol_width.saturating_add(margin.saturating_mul(2));
        // Too small to give every module a pixel: draw each module 4px wide instead.
        let size = if pixel_size >= total {
            pixel_size
        } else {
            total.saturating_mul(FALLBACK_MODULE_PIXELS)
        };
        if size > MAX_PIXEL_SIZE {
            return Err(Error::TooLarge {
                size: size as u64,
                max: MAX_PIXEL_SIZE,
            });
        }

        Ok(Layout {
            margin,
            total,
            size,
        })
    }

    fn module_at(&self, pixel: u32) -> u32 {
        (pixel as u64 * self.total as u64 / self.size as u64) as u32
    }

    /// Half-open pixel range covered by `module`.
    fn span(&self, module: u32) -> (u32, u32) {
        let edge = |m: u32| (m as u64 * self.size as u64).div_ceil(self.total as u64) as u32;
        (edge(module), edge(module + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RasterSurface;

    fn params(pixel_size: u32) -> EncodeParams {
        EncodeParams::from_options(&GenerationOptions::default(), pixel_size)
    }

    #[test]
    fn test_qr_generation() {
        let image = QrEncoder
            .encode_to_raster("Hello, World!", &params(300))
            .unwrap();
        assert_eq!(image.dimensions(), (300, 300));
    }

    #[test]
    fn test_qr_roundtrip() {
        let data = "Test data for QR code roundtrip";
        let image = QrEncoder.encode_to_raster(data, &params(400)).unwrap();

        let gray = image::DynamicImage::ImageRgba8(image).to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare(gray);
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1);

        let (_, content) = grids[0].decode().unwrap();
        assert_eq!(content, data);
    }

    #[test]
    fn test_quiet_zone_uses_light_color() {
        let mut p = params(300);
        p.dark = Color::rgb(10, 20, 30);
        p.light = Color::rgb(250, 240, 230);
        let image = QrEncoder.encode_to_raster("margin", &p).unwrap();

        assert_eq!(*image.get_pixel(0, 0), p.light.to_rgba());
        assert_eq!(*image.get_pixel(299, 299), p.light.to_rgba());
        assert!(image.pixels().any(|px| *px == p.dark.to_rgba()));
    }

    #[test]
    fn test_zero_margin_starts_with_finder_pattern() {
        let mut p = params(210);
        p.margin = 0;
        let image = QrEncoder.encode_to_raster("finder", &p).unwrap();
        assert_eq!(*image.get_pixel(0, 0), Color::BLACK.to_rgba());
    }

    #[test]
    fn test_too_long_for_level_h_fails() {
        let content = "x".repeat(2000);
        let mut p = params(300);
        p.error_correction = ErrorCorrection::H;
        let err = QrEncoder.encode_to_raster(&content, &p).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));

        p.error_correction = ErrorCorrection::L;
        assert!(QrEncoder.encode_to_raster(&content, &p).is_ok());
    }

    #[test]
    fn test_empty_content_is_rejected() {
        let err = QrEncoder.encode_to_vector("", &params(300)).unwrap_err();
        assert!(matches!(err, Error::EmptyContent));
    }

    #[test]
    fn test_small_pixel_size_falls_back_to_four_pixels_per_module() {
        // Version 1 symbol: 21 modules + 2 * 4 quiet zone.
        let image = QrEncoder.encode_to_raster("a", &params(10)).unwrap();
        assert_eq!(image.dimensions(), (116, 116));

        let mut surface = RasterSurface::default();
        QrEncoder
            .encode_to_surface(&mut surface, "a", &params(10))
            .unwrap();
        assert_eq!(surface.image(), &image);
    }

    #[test]
    fn test_oversized_pixel_size_is_rejected() {
        let p = params(MAX_PIXEL_SIZE + 1);
        let err = QrEncoder.encode_to_raster("big", &p).unwrap_err();
        assert!(matches!(err, Error::TooLarge { .. }));
        assert!(QrEncoder.encode_to_vector("big", &p).is_err());

        let mut surface = RasterSurface::new(3, 3);
        let before = surface.image().clone();
        assert!(QrEncoder.encode_to_surface(&mut surface, "big", &p).is_err());
        assert_eq!(surface.image(), &before);

        let svg = QrEncoder
            .encode_to_vector("big", &params(MAX_PIXEL_SIZE))
            .unwrap();
        assert!(svg.contains("width=\"8192\" height=\"8192\""));
    }

    #[test]
    fn test_vector_document() {
        let mut p = params(300);
        p.dark = Color::rgb(0x0f, 0x17, 0x2a);
        let svg = QrEncoder.encode_to_vector("https://example.com", &p).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("width=\"300\" height=\"300\""));
        assert!(svg.contains("#0f172a"));
        assert!(svg.contains("#ffffff"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_surface_matches_raster() {
        let p = params(333);
        let raster = QrEncoder.encode_to_raster("same pixels", &p).unwrap();

        let mut surface = RasterSurface::default();
        QrEncoder
            .encode_to_surface(&mut surface, "same pixels", &p)
            .unwrap();

        assert_eq!(surface.image(), &raster);
    }

    #[test]
    fn test_surface_untouched_on_error() {
        let mut surface = RasterSurface::new(7, 7);
        surface.fill_rect(0, 0, 7, 7, Color::WHITE);
        let before = surface.image().clone();

        let mut p = params(300);
        p.error_correction = ErrorCorrection::H;
        let content = "x".repeat(2000);
        assert!(QrEncoder
            .encode_to_surface(&mut surface, &content, &p)
            .is_err());
        assert_eq!(surface.image(), &before);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let p = params(300);
        let a = QrEncoder.encode_to_raster("idempotent", &p).unwrap();
        let b = QrEncoder.encode_to_raster("idempotent", &p).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());

        let a = QrEncoder.encode_to_vector("idempotent", &p).unwrap();
        let b = QrEncoder.encode_to_vector("idempotent", &p).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_layout_spans_cover_every_pixel() {
        let layout = Layout::new(25, 4, 300).unwrap();
        let mut next = 0;
        for m in 0..layout.total {
            let (start, end) = layout.span(m);
            assert_eq!(start, next);
            assert!(end > start);
            for p in start..end {
                assert_eq!(layout.module_at(p), m);
            }
            next = end;
        }
        assert_eq!(next, 300);
    }
}

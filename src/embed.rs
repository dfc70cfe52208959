//! One-shot rendering driven by untrusted URL parameters, for use as an
//! `<img>`/`<iframe>` source. Every parameter is optional; anything
//! malformed falls back to its default and numbers are clamped.

use crate::options::{clamp, Color, ErrorCorrection, DEFAULT_MARGIN, MAX_MARGIN, MIN_MARGIN};
use crate::qr::{EncodeParams, Encoder};
use crate::surface::{draw_fallback, Surface};

pub const DEFAULT_DIMENSION: u32 = 256;
pub const MIN_DIMENSION: u32 = 32;
pub const MAX_DIMENSION: u32 = 2048;

/// Parses `"<W>x<H>"`. Each side must be a plain decimal number; missing or
/// malformed sides become 256, then both are clamped to [32, 2048].
pub fn parse_dimensions(raw: &str) -> (u32, u32) {
    let mut sides = raw.split('x');
    let width = parse_dimension(sides.next());
    let height = parse_dimension(sides.next());
    (width, height)
}

fn parse_dimension(side: Option<&str>) -> u32 {
    let value = side.map(str::trim).and_then(|s| {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            log::debug!("invalid dimension {:?}, using {}", s, DEFAULT_DIMENSION);
            return None;
        }
        // All digits, so the only possible failure is overflow.
        Some(s.parse::<u64>().unwrap_or(u64::MAX))
    });

    let value = value.unwrap_or(DEFAULT_DIMENSION as u64);
    clamp(value, MIN_DIMENSION as u64, MAX_DIMENSION as u64) as u32
}

fn parse_margin(raw: &str) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(margin) => clamp(margin, MIN_MARGIN as i64, MAX_MARGIN as i64) as u32,
        Err(_) => {
            log::debug!("invalid margin {:?}, using {}", raw, DEFAULT_MARGIN);
            DEFAULT_MARGIN
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: &str, default: T) -> T {
    raw.parse().unwrap_or_else(|_| {
        log::debug!("invalid embed parameter {:?}, using default", raw);
        default
    })
}

/// Normalized render parameters. Immutable: a new parameter snapshot means
/// a new value and a new [`EmbedRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedParameters {
    pub content: String,
    pub width: u32,
    pub height: u32,
    pub foreground: Color,
    pub background: Color,
    pub margin: u32,
    pub error_correction: ErrorCorrection,
}

impl Default for EmbeddedParameters {
    fn default() -> Self {
        EmbeddedParameters {
            content: String::new(),
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            foreground: Color::BLACK,
            background: Color::WHITE,
            margin: DEFAULT_MARGIN,
            error_correction: ErrorCorrection::M,
        }
    }
}

impl EmbeddedParameters {
    /// Builds parameters from already-decoded `(name, value)` pairs:
    /// `content`, `size`, `fg`, `bg`, `margin`, `ecl`. Unknown names are
    /// ignored; a repeated name keeps its first value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = EmbeddedParameters::default();
        let mut seen: Vec<String> = Vec::new();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            if seen.iter().any(|k| k == key) {
                continue;
            }
            seen.push(key.to_string());

            match key {
                "content" => params.content = value.to_string(),
                "size" => (params.width, params.height) = parse_dimensions(value),
                "fg" => params.foreground = parse_or(value, Color::BLACK),
                "bg" => params.background = parse_or(value, Color::WHITE),
                "margin" => params.margin = parse_margin(value),
                "ecl" => params.error_correction = parse_or(value, ErrorCorrection::M),
                _ => {}
            }
        }

        params
    }

    /// The symbol is drawn square at the requested width.
    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            pixel_size: self.width,
            margin: self.margin,
            dark: self.foreground,
            light: self.background,
            error_correction: self.error_correction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Init,
    Rendering,
    Rendered,
    /// The fallback message is on the surface.
    Failed,
    /// Nothing to encode; the surface was left alone.
    Skipped,
}

impl RenderState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RenderState::Rendered | RenderState::Failed | RenderState::Skipped
        )
    }
}

/// Renders one parameter snapshot exactly once.
#[derive(Debug, Clone)]
pub struct EmbedRenderer {
    params: EmbeddedParameters,
    state: RenderState,
}

impl EmbedRenderer {
    pub fn new(params: EmbeddedParameters) -> Self {
        EmbedRenderer {
            params,
            state: RenderState::Init,
        }
    }

    pub fn params(&self) -> &EmbeddedParameters {
        &self.params
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Draws the QR code, or the fallback message if it cannot be encoded.
    /// Encoding errors never escape: they end up on the surface.
    pub fn render<E: Encoder>(&mut self, encoder: &E, surface: &mut dyn Surface) -> RenderState {
        if self.state.is_terminal() {
            return self.state;
        }

        if self.params.content.is_empty() {
            self.state = RenderState::Skipped;
            return self.state;
        }

        self.state = RenderState::Rendering;
        let params = self.params.encode_params();
        self.state = match encoder.encode_to_surface(surface, &self.params.content, &params) {
            Ok(()) => RenderState::Rendered,
            Err(err) => {
                log::warn!("Error generating QR code: {}", err);
                draw_fallback(
                    surface,
                    self.params.width,
                    self.params.height,
                    self.params.foreground,
                    self.params.background,
                );
                RenderState::Failed
            }
        };

        self.state
    }
}

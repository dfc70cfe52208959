pub mod embed;
pub mod error;
pub mod export;
pub mod options;
pub mod preview;
pub mod qr;
pub mod surface;

#[cfg(feature = "cli")]
pub mod terminal;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use embed::{parse_dimensions, EmbedRenderer, EmbeddedParameters, RenderState};
pub use error::{Error, Result};
pub use export::{export, ExportArtifact, ExportFormat, ExportRequest};
pub use options::{
    clamp, size_class_to_pixels, Color, CornerStyle, ErrorCorrection, GenerationOptions,
    SizeClass,
};
pub use preview::{Completion, GenerationJob, PreviewArtifact, PreviewController, PreviewState, DEBOUNCE_MS};
pub use qr::{EncodeParams, Encoder, ModuleMatrix, QrEncoder, MAX_PIXEL_SIZE};
pub use surface::{draw_fallback, RasterSurface, Surface};

#[cfg(feature = "cli")]
pub use terminal::{fits_in_terminal, render_to_terminal};

use std::fmt;
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbaImage};

use crate::error::{Error, Result};
use crate::options::GenerationOptions;
use crate::qr::{EncodeParams, Encoder, MAX_PIXEL_SIZE};

/// Fixed JPEG quality, same as a browser canvas export.
pub const JPEG_QUALITY: u8 = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Png,
    Svg,
    Jpg,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Png, ExportFormat::Svg, ExportFormat::Jpg];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Jpg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Jpg => "image/jpeg",
        }
    }

    /// Scale offered by the download buttons. Vector output is resolution
    /// independent, so SVG stays at 1x.
    pub fn default_scale(self) -> NonZeroU32 {
        match self {
            ExportFormat::Png | ExportFormat::Jpg => NonZeroU32::new(3),
            ExportFormat::Svg => NonZeroU32::new(1),
        }
        .unwrap_or(NonZeroU32::MIN)
    }

    /// Always `qrcode.<ext>`.
    pub fn file_name(self) -> String {
        format!("qrcode.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "svg" => Ok(ExportFormat::Svg),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            _ => Err(Error::parse("export format", s)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub scale: NonZeroU32,
}

impl ExportRequest {
    pub fn new(format: ExportFormat, scale: NonZeroU32) -> Self {
        ExportRequest { format, scale }
    }

    pub fn preset(format: ExportFormat) -> Self {
        ExportRequest::new(format, format.default_scale())
    }

    /// Preview pixel size times the scale, capped at [`MAX_PIXEL_SIZE`].
    pub fn effective_pixel_size(&self, options: &GenerationOptions) -> Result<u32> {
        let base = options.pixel_size();
        let scale = self.scale.get();
        match base.checked_mul(scale) {
            Some(size) if size <= MAX_PIXEL_SIZE => Ok(size),
            _ => Err(Error::TooLarge {
                size: u64::from(base) * u64::from(scale),
                max: MAX_PIXEL_SIZE,
            }),
        }
    }
}

/// A finished download: name, content type and bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Writes the artifact into `dir` under its file name.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Re-encodes the current options at the requested scale.
///
/// Returns `Ok(None)` without touching the encoder when there is no content.
pub fn export<E: Encoder>(
    options: &GenerationOptions,
    request: &ExportRequest,
    encoder: &E,
) -> Result<Option<ExportArtifact>> {
    if !options.has_content() {
        log::debug!("nothing to export: content is empty");
        return Ok(None);
    }

    let pixel_size = request.effective_pixel_size(options)?;
    let params = EncodeParams::from_options(options, pixel_size);

    let bytes = match request.format {
        ExportFormat::Png => encode_png(&encoder.encode_to_raster(&options.content, &params)?)?,
        ExportFormat::Jpg => encode_jpeg(&encoder.encode_to_raster(&options.content, &params)?)?,
        ExportFormat::Svg => encoder
            .encode_to_vector(&options.content, &params)?
            .into_bytes(),
    };

    log::debug!(
        "exported {} at {}px ({} bytes)",
        request.format.file_name(),
        pixel_size,
        bytes.len()
    );

    Ok(Some(ExportArtifact {
        file_name: request.format.file_name(),
        mime_type: request.format.mime_type(),
        bytes,
    }))
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_with_encoder(PngEncoder::new(&mut bytes))?;
    Ok(bytes)
}

/// JPEG has no alpha channel; it is dropped.
pub fn encode_jpeg(image: &RgbaImage) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY))?;
    Ok(bytes)
}

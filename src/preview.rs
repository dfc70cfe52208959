//! Debounced live preview for the interactive editor.
//!
//! The controller owns the current [`GenerationOptions`] and a version
//! counter bumped on every mutation. Time is supplied by the caller as
//! milliseconds on any monotonic clock, so the same state machine runs under
//! a browser timer, a CLI loop or a test.
//!
//! ```text
//! Idle/Rendered/Failed --update--> Pending --poll(deadline passed)--> Generating
//! Generating --complete(ok)--> Rendered
//! Generating --complete(err)--> Failed
//! Pending --poll(empty content)--> Idle
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::RgbaImage;

use crate::error::Result;
use crate::export::encode_png;
use crate::options::{
    clamp, Color, CornerStyle, ErrorCorrection, GenerationOptions, SizeClass, MAX_MARGIN,
    MIN_MARGIN,
};
use crate::qr::{EncodeParams, Encoder};

/// Quiet period after the last mutation before a preview is generated.
pub const DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Idle,
    Pending,
    Generating,
    Rendered,
    Failed,
}

/// What happened to a finished generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The configuration changed while the job was running.
    Discarded,
}

/// A snapshot of the configuration handed out for encoding.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    version: u64,
    options: GenerationOptions,
}

impl GenerationJob {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn params(&self) -> EncodeParams {
        EncodeParams::from_options(&self.options, self.options.pixel_size())
    }

    pub fn run<E: Encoder>(&self, encoder: &E) -> Result<RgbaImage> {
        encoder.encode_to_raster(&self.options.content, &self.params())
    }
}

/// The image currently shown in the preview.
#[derive(Debug, Clone)]
pub struct PreviewArtifact {
    version: u64,
    image: RgbaImage,
}

impl PreviewArtifact {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }

    /// `data:image/png;base64,...`, ready for an `<img src>`.
    pub fn to_data_url(&self) -> Result<String> {
        let png = self.to_png_bytes()?;
        Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
    }
}

#[derive(Debug, Clone)]
pub struct PreviewController {
    options: GenerationOptions,
    version: u64,
    state: PreviewState,
    deadline: Option<u64>,
    in_flight: Option<u64>,
    artifact: Option<PreviewArtifact>,
    last_error: Option<String>,
}

impl Default for PreviewController {
    fn default() -> Self {
        PreviewController::new(GenerationOptions::default())
    }
}

impl PreviewController {
    pub fn new(options: GenerationOptions) -> Self {
        PreviewController {
            options,
            version: 0,
            state: PreviewState::Idle,
            deadline: None,
            in_flight: None,
            artifact: None,
            last_error: None,
        }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    pub fn artifact(&self) -> Option<&PreviewArtifact> {
        self.artifact.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// When the pending generation becomes due, if any.
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Applies a mutation and (re)arms the debounce timer.
    pub fn update(&mut self, now_ms: u64, mutate: impl FnOnce(&mut GenerationOptions)) {
        mutate(&mut self.options);
        self.version += 1;
        self.state = PreviewState::Pending;
        self.deadline = Some(now_ms.saturating_add(DEBOUNCE_MS));
        log::debug!(
            "options changed (version {}), preview due at {}ms",
            self.version,
            now_ms.saturating_add(DEBOUNCE_MS)
        );
    }

    pub fn set_content(&mut self, now_ms: u64, content: impl Into<String>) {
        let content = content.into();
        self.update(now_ms, |o| o.content = content);
    }

    pub fn set_size_class(&mut self, now_ms: u64, size_class: SizeClass) {
        self.update(now_ms, |o| o.size_class = size_class);
    }

    /// Rejects malformed colors without touching the configuration.
    pub fn set_foreground(&mut self, now_ms: u64, color: &str) -> Result<()> {
        let color: Color = color.parse()?;
        self.update(now_ms, |o| o.foreground = color);
        Ok(())
    }

    pub fn set_background(&mut self, now_ms: u64, color: &str) -> Result<()> {
        let color: Color = color.parse()?;
        self.update(now_ms, |o| o.background = color);
        Ok(())
    }

    pub fn set_error_correction(&mut self, now_ms: u64, level: ErrorCorrection) {
        self.update(now_ms, |o| o.error_correction = level);
    }

    pub fn set_corner_style(&mut self, now_ms: u64, style: CornerStyle) {
        self.update(now_ms, |o| o.corner_style = style);
    }

    /// The margin control only offers [0, 8].
    pub fn set_margin(&mut self, now_ms: u64, margin: u32) {
        let margin = clamp(margin, MIN_MARGIN, MAX_MARGIN);
        self.update(now_ms, |o| o.margin = margin);
    }

    /// Hands out the latest configuration once the debounce window has
    /// passed. Returns `None` while another job is still outstanding.
    pub fn poll(&mut self, now_ms: u64) -> Option<GenerationJob> {
        let deadline = self.deadline?;
        if now_ms < deadline || self.in_flight.is_some() {
            return None;
        }
        self.deadline = None;

        if !self.options.has_content() {
            log::debug!("content is empty, skipping preview generation");
            self.state = PreviewState::Idle;
            self.artifact = None;
            self.last_error = None;
            return None;
        }

        self.state = PreviewState::Generating;
        self.in_flight = Some(self.version);
        Some(GenerationJob {
            version: self.version,
            options: self.options.clone(),
        })
    }

    /// Records the outcome of `job`. Results for an outdated configuration
    /// are dropped regardless of the order in which jobs finish.
    pub fn complete(&mut self, job: &GenerationJob, result: Result<RgbaImage>) -> Completion {
        if self.in_flight == Some(job.version) {
            self.in_flight = None;
        }

        if job.version != self.version {
            log::debug!(
                "discarding stale preview for version {} (current {})",
                job.version,
                self.version
            );
            return Completion::Discarded;
        }

        match result {
            Ok(image) => {
                self.artifact = Some(PreviewArtifact {
                    version: job.version,
                    image,
                });
                self.state = PreviewState::Rendered;
                self.last_error = None;
            }
            Err(err) => {
                log::warn!("Error generating QR code: {}", err);
                self.artifact = None;
                self.state = PreviewState::Failed;
                self.last_error = Some(err.to_string());
            }
        }
        Completion::Applied
    }

    /// Polls and, if a job is due, encodes it right away.
    pub fn run_due<E: Encoder>(&mut self, now_ms: u64, encoder: &E) -> Option<Completion> {
        let job = self.poll(now_ms)?;
        let result = job.run(encoder);
        Some(self.complete(&job, result))
    }
}

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Blob, BlobPropertyBag, CanvasRenderingContext2d, HtmlAnchorElement, HtmlCanvasElement, Url,
    UrlSearchParams,
};

use crate::embed::{EmbedRenderer, EmbeddedParameters, RenderState};
use crate::export::{export, ExportArtifact, ExportFormat, ExportRequest};
use crate::options::{Color, CornerStyle, ErrorCorrection, SizeClass};
use crate::preview::{Completion, PreviewController, PreviewState};
use crate::qr::QrEncoder;
use crate::surface::Surface;

const EMBED_PARAMS: [&str; 6] = ["content", "size", "fg", "bg", "margin", "ecl"];

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    _ = console_log::init_with_level(log::Level::Info);
}

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

fn js_error(err: crate::Error) -> JsError {
    JsError::new(&err.to_string())
}

/// [`Surface`] over a 2D canvas context.
struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(CanvasSurface { canvas, context })
    }
}

impl Surface for CanvasSurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        // Assigning the size also clears the canvas.
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        self.context.set_fill_style_str(&color.to_hex());
        self.context
            .fill_rect(x as f64, y as f64, width as f64, height as f64);
    }

    fn fill_text(&mut self, text: &str, cx: u32, cy: u32, color: Color) {
        self.context.set_fill_style_str(&color.to_hex());
        self.context.set_text_align("center");
        self.context.set_text_baseline("middle");
        self.context.set_font("16px sans-serif");
        if let Err(err) = self.context.fill_text(text, cx as f64, cy as f64) {
            log::warn!("fill_text failed: {:?}", err);
        }
    }
}

/// Renders the embeddable view onto `canvas` from a query string such as
/// `?content=hello&size=128x128`. Returns the final state name.
#[wasm_bindgen]
pub fn render_embed(canvas: HtmlCanvasElement, search: &str) -> Result<String, JsValue> {
    let query = UrlSearchParams::new_with_str(search)?;
    let pairs = EMBED_PARAMS
        .iter()
        .filter_map(|name| query.get(name).map(|value| (*name, value)));
    let params = EmbeddedParameters::from_pairs(pairs);

    let mut surface = CanvasSurface::new(canvas)?;
    let state = EmbedRenderer::new(params).render(&QrEncoder, &mut surface);

    Ok(match state {
        RenderState::Init => "init",
        RenderState::Rendering => "rendering",
        RenderState::Rendered => "rendered",
        RenderState::Failed => "failed",
        RenderState::Skipped => "skipped",
    }
    .to_string())
}

/// The interactive editor. JavaScript calls the setters from form inputs
/// and `tick()` from a timer or animation frame.
#[wasm_bindgen]
pub struct QrEditor {
    preview: PreviewController,
}

impl Default for QrEditor {
    fn default() -> Self {
        QrEditor::new()
    }
}

#[wasm_bindgen]
impl QrEditor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> QrEditor {
        QrEditor {
            preview: PreviewController::default(),
        }
    }

    pub fn set_content(&mut self, content: String) {
        self.preview.set_content(now_ms(), content);
    }

    pub fn set_size(&mut self, size: &str) -> Result<(), JsError> {
        let size: SizeClass = size.parse().map_err(js_error)?;
        self.preview.set_size_class(now_ms(), size);
        Ok(())
    }

    pub fn set_foreground(&mut self, color: &str) -> Result<(), JsError> {
        self.preview.set_foreground(now_ms(), color).map_err(js_error)
    }

    pub fn set_background(&mut self, color: &str) -> Result<(), JsError> {
        self.preview.set_background(now_ms(), color).map_err(js_error)
    }

    pub fn set_error_correction(&mut self, level: &str) -> Result<(), JsError> {
        let level: ErrorCorrection = level.parse().map_err(js_error)?;
        self.preview.set_error_correction(now_ms(), level);
        Ok(())
    }

    pub fn set_corner_style(&mut self, style: &str) -> Result<(), JsError> {
        let style: CornerStyle = style.parse().map_err(js_error)?;
        self.preview.set_corner_style(now_ms(), style);
        Ok(())
    }

    pub fn set_margin(&mut self, margin: u32) {
        self.preview.set_margin(now_ms(), margin);
    }

    /// Runs a due preview generation. Returns the new image as a data URL
    /// when one was applied, `undefined` otherwise.
    pub fn tick(&mut self) -> Result<Option<String>, JsError> {
        match self.preview.run_due(now_ms(), &QrEncoder) {
            Some(Completion::Applied) => match self.preview.artifact() {
                Some(artifact) => artifact.to_data_url().map(Some).map_err(js_error),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    pub fn state(&self) -> String {
        match self.preview.state() {
            PreviewState::Idle => "idle",
            PreviewState::Pending => "pending",
            PreviewState::Generating => "generating",
            PreviewState::Rendered => "rendered",
            PreviewState::Failed => "failed",
        }
        .to_string()
    }

    pub fn last_error(&self) -> Option<String> {
        self.preview.last_error().map(str::to_string)
    }

    /// Download buttons are disabled while there is nothing to encode.
    pub fn can_export(&self) -> bool {
        self.preview.options().has_content()
    }

    /// Encodes the current options in `format` at its preset scale and
    /// triggers a browser download of `qrcode.<format>`.
    pub fn download(&self, format: &str) -> Result<(), JsError> {
        let format: ExportFormat = format.parse().map_err(js_error)?;
        let request = ExportRequest::preset(format);
        match export(self.preview.options(), &request, &QrEncoder).map_err(js_error)? {
            Some(artifact) => trigger_download(&artifact)
                .map_err(|err| JsError::new(&format!("download failed: {:?}", err))),
            None => Ok(()),
        }
    }
}

fn trigger_download(artifact: &ExportArtifact) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let body = document.body().ok_or_else(|| JsValue::from_str("no body"))?;

    let bytes = js_sys::Uint8Array::from(artifact.bytes.as_slice());
    let parts = js_sys::Array::of1(&bytes);
    let options = BlobPropertyBag::new();
    options.set_type(artifact.mime_type);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    with_release(
        &url,
        |url| {
            let link = document
                .create_element("a")?
                .dyn_into::<HtmlAnchorElement>()?;
            link.set_href(url);
            link.set_download(&artifact.file_name);
            body.append_child(&link)?;
            link.click();
            body.remove_child(&link)?;
            Ok(())
        },
        |url| Url::revoke_object_url(url),
    )?;

    log::info!("downloaded {}", artifact.file_name);
    Ok(())
}

/// Runs `f` on `resource`, then `release` whatever `f` returned.
/// The error from `f` wins over a release error.
fn with_release<R: ?Sized, T, E>(
    resource: &R,
    f: impl FnOnce(&R) -> Result<T, E>,
    release: impl FnOnce(&R) -> Result<(), E>,
) -> Result<T, E> {
    let result = f(resource);
    let released = release(resource);
    let value = result?;
    released?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_release_runs_when_link_step_fails() {
        let released = Cell::new(false);
        let result: Result<(), String> = with_release(
            "blob:1",
            |_| Err("append failed".to_string()),
            |url| {
                assert_eq!(url, "blob:1");
                released.set(true);
                Ok(())
            },
        );
        assert_eq!(result, Err("append failed".to_string()));
        assert!(released.get());
    }

    #[test]
    fn test_release_error_is_reported_after_success() {
        let result: Result<u8, String> =
            with_release("blob:2", |_| Ok(7), |_| Err("revoke failed".to_string()));
        assert_eq!(result, Err("revoke failed".to_string()));

        let result: Result<u8, String> = with_release("blob:3", |_| Ok(7), |_| Ok(()));
        assert_eq!(result, Ok(7));
    }
}

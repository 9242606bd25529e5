//! WASM bindings for the PDF field designer
//!
//! All interaction state lives in Rust in a [`FieldDesigner`]. JavaScript
//! renders pages with PDF.js, forwards mouse events and performs the upload.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { FieldDesigner } from './pkg/formfield_wasm.js';
//!
//! await init();
//!
//! const designer = new FieldDesigner('drawing-overlay');
//! const info = designer.loadDocument(bytes);
//! designer.setPageGeometry(viewport.width, viewport.height, page.view[0], page.view[1], container.clientWidth);
//! overlay.onmousedown = (e) => designer.pointerDown(e.clientX, e.clientY, e.button);
//! overlay.onmousemove = (e) => designer.pointerMove(e.clientX, e.clientY);
//! overlay.onmouseup = (e) => {
//!     const pending = designer.pointerUp(e.clientX, e.clientY);
//!     if (pending) showNamePrompt(pending);
//! };
//! designer.confirmField(name, defaultValue, multiline);
//! const fieldsJson = designer.fieldsJson();
//! ```

pub mod coords;
pub mod draw;
pub mod overlay;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use coords::{CanvasRect, RenderGeometry};
pub use draw::{DrawError, DrawSession, FieldOverlay, PendingField, PressOutcome, ReleaseOutcome};
use overlay::OverlayManager;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn draw_error(err: DrawError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Page position shown in the navigation bar
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageStatus {
    /// 1-based, for display
    page_number: usize,
    page_count: usize,
    can_go_back: bool,
    can_go_forward: bool,
}

/// Browser-facing wrapper around a [`DrawSession`] and its overlay
#[wasm_bindgen]
pub struct FieldDesigner {
    session: DrawSession,
    overlay: OverlayManager,
}

#[wasm_bindgen]
impl FieldDesigner {
    /// Attach to the overlay element with the given id
    #[wasm_bindgen(constructor)]
    pub fn new(overlay_id: &str) -> Result<FieldDesigner, JsValue> {
        Ok(Self {
            session: DrawSession::new(),
            overlay: OverlayManager::attach(overlay_id)?,
        })
    }

    /// Validate a PDF and start a new session for it
    /// Returns document info (page count, version, form presence)
    #[wasm_bindgen(js_name = loadDocument)]
    pub fn load_document(&mut self, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let info =
            formfield_core::pdf_info(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
        if info.page_count == 0 {
            return Err(JsValue::from_str("PDF has no pages"));
        }

        self.session.load_document(info.page_count);
        self.overlay.clear();
        to_js(&info)
    }

    /// Record the rendered page size and the lower-left corner of its visible
    /// box; call after every render or resize
    /// Returns the scale the page should be rendered at
    #[wasm_bindgen(js_name = setPageGeometry)]
    pub fn set_page_geometry(
        &mut self,
        page_width: f64,
        page_height: f64,
        origin_x: f64,
        origin_y: f64,
        container_width: f64,
    ) -> Result<f64, JsValue> {
        let geometry = RenderGeometry::fit_to_width(page_width, page_height, container_width)
            .with_origin(origin_x, origin_y);
        self.session.set_geometry(geometry);
        self.redraw()?;
        Ok(geometry.scale)
    }

    /// 0-based index of the page on screen
    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> usize {
        self.session.current_page()
    }

    #[wasm_bindgen(js_name = pageStatus)]
    pub fn page_status(&self) -> Result<JsValue, JsValue> {
        to_js(&PageStatus {
            page_number: self.session.current_page() + 1,
            page_count: self.session.page_count(),
            can_go_back: self.session.can_go_back(),
            can_go_forward: self.session.can_go_forward(),
        })
    }

    /// Returns true if the page changed and needs rendering
    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&mut self) -> bool {
        self.overlay.remove_preview();
        self.session.next_page()
    }

    /// Returns true if the page changed and needs rendering
    #[wasm_bindgen(js_name = prevPage)]
    pub fn prev_page(&mut self) -> bool {
        self.overlay.remove_preview();
        self.session.prev_page()
    }

    /// Returns a status message when the press cannot start a drag
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, client_x: f64, client_y: f64, button: i16) -> Option<String> {
        let (x, y) = self.overlay.relative_point(client_x, client_y);
        match self.session.pointer_down(x, y, button) {
            PressOutcome::NoDocument => Some(DrawError::NoDocument.to_string()),
            PressOutcome::Ignored | PressOutcome::Started => None,
        }
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, client_x: f64, client_y: f64) -> Result<(), JsValue> {
        let (x, y) = self.overlay.relative_point(client_x, client_y);
        if let Some(rect) = self.session.pointer_move(x, y) {
            self.overlay.show_preview(&rect)?;
        }
        Ok(())
    }

    /// Returns the pending field (page index and PDF rectangle) when the
    /// drag should be named, or undefined
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, client_x: f64, client_y: f64) -> Result<JsValue, JsValue> {
        let (x, y) = self.overlay.relative_point(client_x, client_y);
        match self.session.pointer_up(x, y) {
            ReleaseOutcome::NeedsName(pending) => to_js(&pending),
            ReleaseOutcome::TooSmall => {
                self.overlay.remove_preview();
                Ok(JsValue::UNDEFINED)
            }
            ReleaseOutcome::Ignored => Ok(JsValue::UNDEFINED),
        }
    }

    /// Drop a drag when the pointer leaves the overlay
    #[wasm_bindgen(js_name = abortDrag)]
    pub fn abort_drag(&mut self) {
        self.session.abort_drag();
        self.overlay.remove_preview();
    }

    /// Name the pending field; an empty name errors and keeps it pending
    #[wasm_bindgen(js_name = confirmField)]
    pub fn confirm_field(
        &mut self,
        name: &str,
        default_value: &str,
        multiline: bool,
    ) -> Result<JsValue, JsValue> {
        let field = self
            .session
            .confirm_field(name, default_value, multiline)
            .map_err(draw_error)?
            .clone();
        self.redraw()?;
        to_js(&field)
    }

    #[wasm_bindgen(js_name = cancelField)]
    pub fn cancel_field(&mut self) {
        self.session.cancel_field();
        self.overlay.remove_preview();
    }

    /// Remove a field by its position in the list; returns its name
    #[wasm_bindgen(js_name = removeField)]
    pub fn remove_field(&mut self, index: usize) -> Result<String, JsValue> {
        let removed = self.session.remove_field(index).map_err(draw_error)?;
        self.redraw()?;
        Ok(removed.field_name)
    }

    /// All defined fields, in definition order
    #[wasm_bindgen(js_name = getFields)]
    pub fn get_fields(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.fields())
    }

    /// JSON for the `fields` upload part; errors when there is nothing to send
    #[wasm_bindgen(js_name = fieldsJson)]
    pub fn fields_json(&self) -> Result<String, JsValue> {
        self.session.fields_json().map_err(draw_error)
    }

    /// Redraw the overlays for the current page
    pub fn redraw(&self) -> Result<(), JsValue> {
        self.overlay.render(&self.session.overlays())
    }
}

//! Field rectangles drawn as absolutely positioned divs over the canvas

use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement};

use crate::coords::CanvasRect;
use crate::draw::FieldOverlay;

const FIELD_CLASS: &str = "drawn-field";
const PREVIEW_CLASS: &str = "drawn-field drawing";
const PREVIEW_ID: &str = "draw-preview";

/// Owns the children of the overlay element
pub struct OverlayManager {
    document: Document,
    container: Element,
}

impl OverlayManager {
    /// Attach to the element with the given id
    ///
    /// # Errors
    /// Returns JsValue error if the window, document or element is missing
    pub fn attach(container_id: &str) -> Result<Self, JsValue> {
        let window =
            web_sys::window().ok_or_else(|| JsValue::from_str("No window object available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document object available"))?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("No element with id '{}'", container_id)))?;

        Ok(Self {
            document,
            container,
        })
    }

    /// Convert viewport coordinates to coordinates relative to the overlay
    pub fn relative_point(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        let bounds = self.container.get_bounding_client_rect();
        (client_x - bounds.left(), client_y - bounds.top())
    }

    pub fn clear(&self) {
        self.container.set_inner_html("");
    }

    /// Replace all overlays with the given fields
    pub fn render(&self, overlays: &[FieldOverlay]) -> Result<(), JsValue> {
        self.clear();
        for overlay in overlays {
            let div = self.rect_element(&overlay.rect, FIELD_CLASS)?;
            div.set_attribute("data-index", &overlay.index.to_string())?;
            div.set_attribute("title", &overlay.field_name)?;
            div.set_text_content(Some(&overlay.field_name));
            self.container.append_child(&div)?;
        }
        Ok(())
    }

    /// Show or move the rectangle being dragged
    pub fn show_preview(&self, rect: &CanvasRect) -> Result<(), JsValue> {
        match self.document.get_element_by_id(PREVIEW_ID) {
            Some(existing) => apply_rect(&existing, rect),
            None => {
                let div = self.rect_element(rect, PREVIEW_CLASS)?;
                div.set_id(PREVIEW_ID);
                self.container.append_child(&div)?;
                Ok(())
            }
        }
    }

    pub fn remove_preview(&self) {
        if let Some(existing) = self.document.get_element_by_id(PREVIEW_ID) {
            existing.remove();
        }
    }

    fn rect_element(&self, rect: &CanvasRect, class: &str) -> Result<Element, JsValue> {
        let div = self.document.create_element("div")?;
        div.set_class_name(class);
        apply_rect(&div, rect)?;
        Ok(div)
    }
}

fn apply_rect(element: &Element, rect: &CanvasRect) -> Result<(), JsValue> {
    if let Some(html_element) = element.dyn_ref::<HtmlElement>() {
        let style = html_element.style();
        style.set_property("position", "absolute")?;
        style.set_property("left", &format!("{}px", rect.left))?;
        style.set_property("top", &format!("{}px", rect.top))?;
        style.set_property("width", &format!("{}px", rect.width))?;
        style.set_property("height", &format!("{}px", rect.height))?;
    }
    Ok(())
}

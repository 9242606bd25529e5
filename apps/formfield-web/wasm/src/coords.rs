//! Coordinate transformation between canvas pixels and PDF points
//!
//! The canvas has its origin at the top-left with y growing downwards; PDF
//! user space has its origin at the bottom-left with y growing upwards. A page
//! rendered at `scale` occupies `page_height * scale` canvas pixels. The
//! canvas bottom-left corner sits at the visible box's lower-left corner,
//! which is not always (0, 0).

use formfield_core::PdfRect;
use serde::Serialize;

/// How a page is currently laid out on the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderGeometry {
    /// Canvas pixels per PDF point
    pub scale: f64,
    /// Canvas height in pixels
    pub canvas_height: f64,
    /// PDF x of the visible box's left edge
    pub origin_x: f64,
    /// PDF y of the visible box's bottom edge
    pub origin_y: f64,
}

impl RenderGeometry {
    pub fn new(scale: f64, canvas_height: f64) -> Self {
        Self {
            scale,
            canvas_height,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }

    /// Offset for pages whose MediaBox or CropBox does not start at (0, 0)
    pub fn with_origin(mut self, origin_x: f64, origin_y: f64) -> Self {
        self.origin_x = origin_x;
        self.origin_y = origin_y;
        self
    }

    /// Geometry for a page fitted to the container width.
    pub fn fit_to_width(page_width: f64, page_height: f64, container_width: f64) -> Self {
        let scale = fit_scale(container_width, page_width);
        Self::new(scale, page_height * scale)
    }
}

/// Scale that makes a page of `page_width` points fill `container_width` pixels
pub fn fit_scale(container_width: f64, page_width: f64) -> f64 {
    if page_width > 0.0 && container_width > 0.0 {
        container_width / page_width
    } else {
        1.0
    }
}

/// Convert canvas coordinates (top-left origin, pixels) to PDF coordinates (bottom-left origin, points)
pub fn canvas_to_pdf(canvas_x: f64, canvas_y: f64, geometry: &RenderGeometry) -> (f64, f64) {
    let pdf_x = geometry.origin_x + canvas_x / geometry.scale;
    let pdf_y = geometry.origin_y + (geometry.canvas_height - canvas_y) / geometry.scale;
    (pdf_x, pdf_y)
}

/// Convert PDF coordinates to canvas coordinates
pub fn pdf_to_canvas(pdf_x: f64, pdf_y: f64, geometry: &RenderGeometry) -> (f64, f64) {
    let canvas_x = (pdf_x - geometry.origin_x) * geometry.scale;
    let canvas_y = geometry.canvas_height - (pdf_y - geometry.origin_y) * geometry.scale;
    (canvas_x, canvas_y)
}

/// Rectangle in canvas pixels, positioned by its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasRect {
    /// Rectangle spanned by two corners, in any order
    pub fn from_points(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            left: a.0.min(b.0),
            top: a.1.min(b.1),
            width: (b.0 - a.0).abs(),
            height: (b.1 - a.1).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// The same region in PDF points
    pub fn to_pdf(&self, geometry: &RenderGeometry) -> PdfRect {
        // The canvas bottom-left corner is the PDF origin corner
        let (x1, y1) = canvas_to_pdf(self.left, self.bottom(), geometry);
        let (x2, y2) = canvas_to_pdf(self.right(), self.top, geometry);
        PdfRect::from_corners(x1, y1, x2, y2)
    }

    pub fn from_pdf(rect: &PdfRect, geometry: &RenderGeometry) -> Self {
        let top_left = pdf_to_canvas(rect.x, rect.y + rect.height, geometry);
        let bottom_right = pdf_to_canvas(rect.x + rect.width, rect.y, geometry);
        Self::from_points(top_left, bottom_right)
    }
}

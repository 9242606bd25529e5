//! Drawing session state
//!
//! Holds everything the designer page needs between events: the loaded
//! document's page count, the current page and its geometry, the drag in
//! progress, the rectangle waiting for a name and the defined fields. All
//! methods take canvas-relative pixel coordinates and are free of DOM access,
//! so the state machine is testable natively.

use formfield_core::{FieldDefinition, PdfRect};
use serde::Serialize;

use crate::coords::{CanvasRect, RenderGeometry};

/// Drags smaller than this in either dimension are treated as clicks
pub const MIN_DRAW_SIZE: f64 = 10.0;

/// Primary mouse button as reported by `MouseEvent.button`
pub const PRIMARY_BUTTON: i16 = 0;

/// Interaction state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawState {
    Idle,
    Drawing {
        anchor: (f64, f64),
        current: (f64, f64),
    },
}

/// A drawn rectangle waiting for its name
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingField {
    pub page_index: usize,
    pub rect: PdfRect,
}

/// Result of a pointer press
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressOutcome {
    /// No PDF loaded yet
    NoDocument,
    /// Not the primary button, or a name prompt is open
    Ignored,
    Started,
}

/// Result of a pointer release
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleaseOutcome {
    /// No drag was in progress
    Ignored,
    /// The drag was smaller than [`MIN_DRAW_SIZE`]
    TooSmall,
    /// The drag produced a field that now needs a name
    NeedsName(PendingField),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawError {
    NoDocument,
    NoPendingField,
    EmptyName,
    NoFields,
    IndexOutOfRange(usize),
    Serialization(String),
}

impl std::fmt::Display for DrawError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawError::NoDocument => write!(f, "Please load a PDF first to draw fields."),
            DrawError::NoPendingField => write!(f, "No drawn field is waiting for a name."),
            DrawError::EmptyName => write!(f, "Please enter a field name."),
            DrawError::NoFields => write!(f, "No fields defined. Draw fields on the PDF."),
            DrawError::IndexOutOfRange(index) => write!(f, "No field at index {}.", index),
            DrawError::Serialization(msg) => write!(f, "Could not encode fields: {}", msg),
        }
    }
}

/// An overlay to draw for a defined field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOverlay {
    /// Position in the full field list
    pub index: usize,
    pub field_name: String,
    pub rect: CanvasRect,
}

#[derive(Debug, Clone)]
pub struct DrawSession {
    page_count: usize,
    current_page: usize,
    geometry: RenderGeometry,
    state: DrawState,
    pending: Option<PendingField>,
    fields: Vec<FieldDefinition>,
}

impl Default for DrawSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSession {
    pub fn new() -> Self {
        Self {
            page_count: 0,
            current_page: 0,
            geometry: RenderGeometry::new(1.0, 0.0),
            state: DrawState::Idle,
            pending: None,
            fields: Vec::new(),
        }
    }

    /// Start over with a newly loaded document.
    pub fn load_document(&mut self, page_count: usize) {
        self.page_count = page_count;
        self.current_page = 0;
        self.state = DrawState::Idle;
        self.pending = None;
        self.fields.clear();
    }

    pub fn has_document(&self) -> bool {
        self.page_count > 0
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// 0-based index of the page on screen
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn pending(&self) -> Option<PendingField> {
        self.pending
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn geometry(&self) -> RenderGeometry {
        self.geometry
    }

    /// Record how the current page was rendered.
    pub fn set_geometry(&mut self, geometry: RenderGeometry) {
        self.geometry = geometry;
    }

    /// Move to another page; returns false when out of range.
    pub fn go_to_page(&mut self, page_index: usize) -> bool {
        if page_index >= self.page_count {
            return false;
        }
        self.current_page = page_index;
        self.state = DrawState::Idle;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(page) => self.go_to_page(page),
            None => false,
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.current_page > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.current_page + 1 < self.page_count
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, button: i16) -> PressOutcome {
        if !self.has_document() {
            return PressOutcome::NoDocument;
        }
        if button != PRIMARY_BUTTON || self.pending.is_some() {
            return PressOutcome::Ignored;
        }
        self.state = DrawState::Drawing {
            anchor: (x, y),
            current: (x, y),
        };
        PressOutcome::Started
    }

    /// Resize the drag in progress; returns the rectangle to preview.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<CanvasRect> {
        match &mut self.state {
            DrawState::Drawing { anchor, current } => {
                *current = (x, y);
                Some(CanvasRect::from_points(*anchor, *current))
            }
            DrawState::Idle => None,
        }
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> ReleaseOutcome {
        let DrawState::Drawing { anchor, .. } = self.state else {
            return ReleaseOutcome::Ignored;
        };
        self.state = DrawState::Idle;

        let drawn = CanvasRect::from_points(anchor, (x, y));
        if drawn.width < MIN_DRAW_SIZE || drawn.height < MIN_DRAW_SIZE {
            return ReleaseOutcome::TooSmall;
        }

        let pending = PendingField {
            page_index: self.current_page,
            rect: drawn.to_pdf(&self.geometry),
        };
        self.pending = Some(pending);
        ReleaseOutcome::NeedsName(pending)
    }

    /// Drop the drag in progress, if any.
    pub fn abort_drag(&mut self) {
        self.state = DrawState::Idle;
    }

    /// Name the pending field and append it to the list.
    ///
    /// An empty name is rejected and the pending field is kept.
    pub fn confirm_field(
        &mut self,
        name: &str,
        default_value: &str,
        multiline: bool,
    ) -> Result<&FieldDefinition, DrawError> {
        let pending = self.pending.ok_or(DrawError::NoPendingField)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DrawError::EmptyName);
        }

        let mut field =
            FieldDefinition::new(pending.page_index, name, pending.rect).with_multiline(multiline);
        let default_value = default_value.trim();
        if !default_value.is_empty() {
            field = field.with_default_value(default_value);
        }

        self.pending = None;
        self.fields.push(field);
        Ok(&self.fields[self.fields.len() - 1])
    }

    /// Discard the pending field.
    pub fn cancel_field(&mut self) {
        self.pending = None;
    }

    pub fn remove_field(&mut self, index: usize) -> Result<FieldDefinition, DrawError> {
        if index >= self.fields.len() {
            return Err(DrawError::IndexOutOfRange(index));
        }
        Ok(self.fields.remove(index))
    }

    /// Overlays for the fields on the current page.
    pub fn overlays(&self) -> Vec<FieldOverlay> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.page() == Some(self.current_page))
            .map(|(index, field)| FieldOverlay {
                index,
                field_name: field.field_name.clone(),
                rect: CanvasRect::from_pdf(&field.rect(), &self.geometry),
            })
            .collect()
    }

    /// The JSON array submitted with the add-fields request.
    pub fn fields_json(&self) -> Result<String, DrawError> {
        if !self.has_document() {
            return Err(DrawError::NoDocument);
        }
        if self.fields.is_empty() {
            return Err(DrawError::NoFields);
        }
        serde_json::to_string(&self.fields).map_err(|e| DrawError::Serialization(e.to_string()))
    }
}

//! Field definitions, fill maps and per-field outcome reporting

use std::collections::BTreeMap;
use std::fmt;

use lopdf::Object;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FormFieldError;

/// Field name to string value, applied to fields already present in a form.
pub type FillMap = BTreeMap<String, String>;

/// Rectangle in PDF points, origin at the bottom-left of the page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from two opposite corners in any order.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// `[llx lly urx ury]` as stored in a PDF `Rect` entry
    pub fn to_pdf_array(&self) -> Object {
        Object::Array(vec![
            Object::Real(self.x as f32),
            Object::Real(self.y as f32),
            Object::Real((self.x + self.width) as f32),
            Object::Real((self.y + self.height) as f32),
        ])
    }

    /// Parse a PDF `Rect` array, normalising swapped corners.
    pub fn from_pdf_array(items: &[Object]) -> Option<Self> {
        if items.len() != 4 {
            return None;
        }
        let mut coords = [0.0f64; 4];
        for (slot, item) in coords.iter_mut().zip(items) {
            *slot = pdf_number(item)?;
        }
        Some(Self::from_corners(coords[0], coords[1], coords[2], coords[3]))
    }
}

pub(crate) fn pdf_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(*v as f64),
        _ => None,
    }
}

/// A text field the user drew on a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// 0-based page index; signed so an out-of-range request is reported
    /// per field instead of failing the whole payload
    pub page_index: i64,
    pub field_name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl FieldDefinition {
    pub fn new(page_index: usize, field_name: impl Into<String>, rect: PdfRect) -> Self {
        Self {
            page_index: i64::try_from(page_index).unwrap_or(i64::MAX),
            field_name: field_name.into(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            multiline: false,
            default_value: None,
        }
    }

    pub fn with_multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// The page index, if it can name a page at all
    pub fn page(&self) -> Option<usize> {
        usize::try_from(self.page_index).ok()
    }

    pub fn rect(&self) -> PdfRect {
        PdfRect::new(self.x, self.y, self.width, self.height)
    }

    /// Default text, with blank values treated as absent
    pub fn effective_default(&self) -> Option<&str> {
        self.default_value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Why a requested field was not applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    NotFound,
    NotATextField { actual: String },
    PageOutOfRange { page_index: i64, page_count: usize },
    DuplicateName,
    EmptyName,
    InvalidGeometry,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "no such field in the form"),
            SkipReason::NotATextField { actual } => {
                write!(f, "field is not a text field (type {})", actual)
            }
            SkipReason::PageOutOfRange {
                page_index,
                page_count,
            } => write!(
                f,
                "page index {} out of range (document has {} pages)",
                page_index, page_count
            ),
            SkipReason::DuplicateName => write!(f, "a field with this name already exists"),
            SkipReason::EmptyName => write!(f, "field name is empty"),
            SkipReason::InvalidGeometry => {
                write!(f, "rectangle must have finite position and positive size")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome {
    Applied { name: String },
    Skipped { name: String, reason: SkipReason },
}

impl FieldOutcome {
    pub fn name(&self) -> &str {
        match self {
            FieldOutcome::Applied { name } | FieldOutcome::Skipped { name, .. } => name,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, FieldOutcome::Applied { .. })
    }
}

/// Ordered outcomes for one fill or add operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldReport {
    pub outcomes: Vec<FieldOutcome>,
    pub applied: usize,
    pub skipped: usize,
}

impl FieldReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&mut self, name: impl Into<String>) {
        self.applied += 1;
        self.outcomes.push(FieldOutcome::Applied { name: name.into() });
    }

    pub fn skipped(&mut self, name: impl Into<String>, reason: SkipReason) {
        self.skipped += 1;
        self.outcomes.push(FieldOutcome::Skipped {
            name: name.into(),
            reason,
        });
    }

    pub fn skipped_names(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_applied())
            .map(FieldOutcome::name)
            .collect()
    }
}

/// Field type as declared by the `FT` entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Button,
    Choice,
    Signature,
    Unknown,
}

impl FieldKind {
    pub fn from_pdf_name(name: Option<&[u8]>) -> Self {
        match name {
            Some(b"Tx") => FieldKind::Text,
            Some(b"Btn") => FieldKind::Button,
            Some(b"Ch") => FieldKind::Choice,
            Some(b"Sig") => FieldKind::Signature,
            _ => FieldKind::Unknown,
        }
    }
}

/// A field found in an existing document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormFieldInfo {
    /// Fully qualified name (`parent.child`)
    pub name: String,
    pub kind: FieldKind,
    pub page_index: Option<usize>,
    pub rect: Option<PdfRect>,
    pub value: Option<String>,
    pub multiline: bool,
}

/// Parse the JSON value map sent with a fill request.
///
/// Values are coerced to strings; the map must be a non-empty object.
pub fn parse_fill_map(json: &str) -> Result<FillMap, FormFieldError> {
    if json.trim().is_empty() {
        return Err(FormFieldError::InvalidPayload(
            "field values are empty".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(json)
        .map_err(|e| FormFieldError::InvalidPayload(format!("field values are not JSON: {}", e)))?;

    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(FormFieldError::InvalidPayload(format!(
                "field values must be a JSON object, got {}",
                json_type_name(&other)
            )))
        }
    };

    if object.is_empty() {
        return Err(FormFieldError::InvalidPayload(
            "no field values provided".to_string(),
        ));
    }

    Ok(object
        .into_iter()
        .map(|(name, value)| (name, coerce_to_string(value)))
        .collect())
}

/// Parse the JSON array of field definitions sent with an add request.
pub fn parse_field_definitions(json: &str) -> Result<Vec<FieldDefinition>, FormFieldError> {
    if json.trim().is_empty() {
        return Err(FormFieldError::InvalidPayload(
            "field definitions are empty".to_string(),
        ));
    }

    let fields: Vec<FieldDefinition> = serde_json::from_str(json).map_err(|e| {
        FormFieldError::InvalidPayload(format!("invalid field definitions: {}", e))
    })?;

    if fields.is_empty() {
        return Err(FormFieldError::InvalidPayload(
            "no field definitions provided".to_string(),
        ));
    }

    Ok(fields)
}

fn coerce_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Normal appearance streams for text fields

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::acroform::FONT_RESOURCE;
use crate::error::FormFieldError;
use crate::text::to_win_ansi;

const DEFAULT_FONT_SIZE: f32 = 12.0;
const MIN_FONT_SIZE: f32 = 4.0;
const PADDING: f32 = 2.0;
const LINE_SPACING: f32 = 1.15;

/// Visual styling applied to a text field widget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStyle {
    pub background: Option<[f32; 3]>,
    pub border: Option<[f32; 3]>,
    pub border_width: f32,
    pub text_color: [f32; 3],
    pub font_size: f32,
}

impl FieldStyle {
    /// Styling for fields added by this crate: black text on light gray,
    /// with a gray border.
    pub const ADDED: FieldStyle = FieldStyle {
        background: Some([0.94, 0.94, 0.94]),
        border: Some([0.75, 0.75, 0.75]),
        border_width: 1.0,
        text_color: [0.0, 0.0, 0.0],
        font_size: DEFAULT_FONT_SIZE,
    };

    /// Text only, for refilling fields that already carry their own look.
    pub const PLAIN: FieldStyle = FieldStyle {
        background: None,
        border: None,
        border_width: 0.0,
        text_color: [0.0, 0.0, 0.0],
        font_size: DEFAULT_FONT_SIZE,
    };

    /// `MK` appearance characteristics dictionary
    pub fn characteristics(&self) -> lopdf::Dictionary {
        let mut mk = lopdf::Dictionary::new();
        if let Some(border) = self.border {
            mk.set("BC", color_array(border));
        }
        if let Some(background) = self.background {
            mk.set("BG", color_array(background));
        }
        mk
    }

    /// `BS` border style dictionary
    pub fn border_style(&self) -> lopdf::Dictionary {
        dictionary! {
            "W" => Object::Real(self.border_width),
            "S" => "S",
        }
    }
}

fn color_array(rgb: [f32; 3]) -> Object {
    Object::Array(rgb.iter().map(|c| Object::Real(*c)).collect())
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|v| Object::Real(*v)).collect()
}

/// Font size that fits a single line into the box height
fn fitted_font_size(style: &FieldStyle, height: f32, multiline: bool) -> f32 {
    if multiline {
        return style.font_size;
    }
    let available = (height - 2.0 * (PADDING + style.border_width)).max(0.0);
    style.font_size.min(available * 0.85).max(MIN_FONT_SIZE)
}

/// Content stream operations painting the box and its text.
pub fn appearance_operations(
    width: f32,
    height: f32,
    text: &str,
    multiline: bool,
    style: &FieldStyle,
) -> Vec<Operation> {
    let mut ops = Vec::new();

    if let Some([r, g, b]) = style.background {
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("rg", reals(&[r, g, b])));
        ops.push(Operation::new("re", reals(&[0.0, 0.0, width, height])));
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    if let Some([r, g, b]) = style.border {
        let half = style.border_width / 2.0;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("RG", reals(&[r, g, b])));
        ops.push(Operation::new("w", reals(&[style.border_width])));
        ops.push(Operation::new(
            "re",
            reals(&[
                half,
                half,
                width - style.border_width,
                height - style.border_width,
            ]),
        ));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    ops.push(Operation::new(
        "BMC",
        vec![Object::Name(b"Tx".to_vec())],
    ));
    if !text.is_empty() {
        let inset = PADDING + style.border_width;
        let font_size = fitted_font_size(style, height, multiline);
        let [r, g, b] = style.text_color;

        ops.push(Operation::new("q", vec![]));
        // Clip to the inner box
        ops.push(Operation::new(
            "re",
            reals(&[
                inset,
                inset,
                (width - 2.0 * inset).max(0.0),
                (height - 2.0 * inset).max(0.0),
            ]),
        ));
        ops.push(Operation::new("W", vec![]));
        ops.push(Operation::new("n", vec![]));
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(font_size),
            ],
        ));
        ops.push(Operation::new("rg", reals(&[r, g, b])));

        let lines: Vec<&str> = if multiline {
            text.lines().collect()
        } else {
            vec![text.lines().next().unwrap_or("")]
        };
        let baseline = if multiline {
            height - inset - font_size
        } else {
            // Vertically centred; descenders take roughly a fifth of the size
            (height - font_size) / 2.0 + font_size * 0.2
        };

        ops.push(Operation::new(
            "TL",
            reals(&[font_size * LINE_SPACING]),
        ));
        ops.push(Operation::new("Td", reals(&[inset, baseline])));
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ops.push(Operation::new("T*", vec![]));
            }
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(to_win_ansi(line), StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }
    ops.push(Operation::new("EMC", vec![]));

    ops
}

/// Add a Form XObject holding the normal appearance of a text widget.
pub fn build_text_appearance(
    doc: &mut Document,
    font_id: ObjectId,
    width: f32,
    height: f32,
    text: &str,
    multiline: bool,
    style: &FieldStyle,
) -> Result<ObjectId, FormFieldError> {
    let content = Content {
        operations: appearance_operations(width, height, text, multiline, style),
    };
    let encoded = content
        .encode()
        .map_err(|e| FormFieldError::Structure(format!("appearance stream: {}", e)))?;

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => reals(&[0.0, 0.0, width, height]),
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    FONT_RESOURCE => Object::Reference(font_id),
                },
            },
        },
        encoded,
    );

    Ok(doc.add_object(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(ops: &[Operation]) -> Vec<&str> {
        ops.iter().map(|op| op.operator.as_str()).collect()
    }

    #[test]
    fn test_added_style_paints_background_and_border() {
        let ops = appearance_operations(200.0, 20.0, "", false, &FieldStyle::ADDED);
        let names = operators(&ops);
        assert_eq!(names.iter().filter(|n| **n == "re").count(), 2);
        assert!(names.contains(&"f"));
        assert!(names.contains(&"S"));
        assert!(!names.contains(&"Tj"));
        assert_eq!(names.last(), Some(&"EMC"));
    }

    #[test]
    fn test_plain_style_only_draws_text() {
        let ops = appearance_operations(200.0, 20.0, "Mohan", false, &FieldStyle::PLAIN);
        let names = operators(&ops);
        assert!(!names.contains(&"f"));
        assert!(!names.contains(&"S"));
        assert_eq!(names.iter().filter(|n| **n == "Tj").count(), 1);
    }

    #[test]
    fn test_single_line_keeps_first_line() {
        let ops = appearance_operations(200.0, 20.0, "one\ntwo", false, &FieldStyle::PLAIN);
        assert_eq!(operators(&ops).iter().filter(|n| **n == "Tj").count(), 1);
    }

    #[test]
    fn test_multiline_draws_each_line() {
        let ops = appearance_operations(200.0, 80.0, "one\ntwo\nthree", true, &FieldStyle::ADDED);
        let names = operators(&ops);
        assert_eq!(names.iter().filter(|n| **n == "Tj").count(), 3);
        assert_eq!(names.iter().filter(|n| **n == "T*").count(), 2);
    }

    #[test]
    fn test_font_shrinks_for_short_boxes() {
        let size = fitted_font_size(&FieldStyle::ADDED, 12.0, false);
        assert!(size < DEFAULT_FONT_SIZE);
        assert!(size >= MIN_FONT_SIZE);
        assert_eq!(fitted_font_size(&FieldStyle::ADDED, 40.0, false), DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_characteristics_follow_style() {
        assert!(FieldStyle::ADDED.characteristics().has(b"BG"));
        assert!(FieldStyle::ADDED.characteristics().has(b"BC"));
        assert!(!FieldStyle::PLAIN.characteristics().has(b"BG"));
    }
}

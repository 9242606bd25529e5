//! Write values into text fields that already exist in a form

use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::acroform::{self, FieldNode};
use crate::appearance::{build_text_appearance, FieldStyle};
use crate::error::FormFieldError;
use crate::text::encode_text_string;
use crate::types::{FieldReport, FillMap, PdfRect, SkipReason};
use crate::validation::{load_document, save_document};

/// Fill named text fields of an existing form.
///
/// Unknown names and non-text fields are skipped and reported; only load
/// and save failures are errors. When nothing is applied the input bytes
/// are returned untouched.
pub fn fill_fields(
    pdf_bytes: &[u8],
    values: &FillMap,
) -> Result<(Vec<u8>, FieldReport), FormFieldError> {
    let mut doc = load_document(pdf_bytes)?;
    let report = fill_document(&mut doc, values)?;

    if report.applied == 0 {
        return Ok((pdf_bytes.to_vec(), report));
    }

    let output = save_document(&mut doc)?;
    Ok((output, report))
}

/// Fill fields in an already loaded document.
pub fn fill_document(doc: &mut Document, values: &FillMap) -> Result<FieldReport, FormFieldError> {
    let fields = acroform::collect_fields(doc);
    let mut report = FieldReport::new();
    let mut font_id: Option<ObjectId> = None;

    for (name, value) in values {
        let matches: Vec<&FieldNode> = fields.iter().filter(|f| &f.name == name).collect();

        if matches.is_empty() {
            warn!("Field \"{}\" not found in PDF form", name);
            report.skipped(name.as_str(), SkipReason::NotFound);
            continue;
        }

        if let Some(other) = matches.iter().find(|f| !f.is_text()) {
            let reason = SkipReason::NotATextField {
                actual: other.type_name(),
            };
            warn!("Field \"{}\" skipped: {}", name, reason);
            report.skipped(name.as_str(), reason);
            continue;
        }

        let font = match font_id {
            Some(id) => id,
            None => {
                let form = acroform::ensure_acroform(doc)?;
                let id = acroform::ensure_form_font(doc, form)?;
                font_id = Some(id);
                id
            }
        };

        for field in matches {
            set_text_value(doc, field, value, font)?;
        }
        debug!("Filled field \"{}\"", name);
        report.applied(name.as_str());
    }

    if report.applied > 0 {
        let form = acroform::ensure_acroform(doc)?;
        acroform::set_need_appearances(doc, form)?;
    }

    Ok(report)
}

fn set_text_value(
    doc: &mut Document,
    field: &FieldNode,
    value: &str,
    font_id: ObjectId,
) -> Result<(), FormFieldError> {
    doc.get_dictionary_mut(field.id)?
        .set("V", encode_text_string(value));

    for &widget_id in &field.widgets {
        let rect = match doc.get_dictionary(widget_id)?.get(b"Rect") {
            Ok(Object::Array(items)) => PdfRect::from_pdf_array(items),
            _ => None,
        };

        match rect.filter(PdfRect::is_well_formed) {
            Some(rect) => {
                let appearance = build_text_appearance(
                    doc,
                    font_id,
                    rect.width as f32,
                    rect.height as f32,
                    value,
                    field.is_multiline(),
                    &FieldStyle::PLAIN,
                )?;
                doc.get_dictionary_mut(widget_id)?
                    .set("AP", dictionary! { "N" => Object::Reference(appearance) });
            }
            None => {
                // Leave rendering to the viewer via NeedAppearances
                doc.get_dictionary_mut(widget_id)?.remove(b"AP");
            }
        }
    }

    Ok(())
}

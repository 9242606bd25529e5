//! Create new fillable text fields at given page rectangles

use std::collections::{BTreeMap, HashSet};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, warn};

use crate::acroform::{self, DEFAULT_APPEARANCE, FLAG_MULTILINE};
use crate::appearance::{build_text_appearance, FieldStyle};
use crate::error::FormFieldError;
use crate::text::encode_text_string;
use crate::types::{FieldDefinition, FieldReport, SkipReason};
use crate::validation::{load_document, save_document};

/// `F` bit 3: print the annotation
const ANNOT_FLAG_PRINT: i64 = 4;

/// Add a text field for every valid definition.
///
/// Definitions with an out-of-range page, an empty or duplicate name or a
/// degenerate rectangle are skipped and reported. When nothing is added the
/// input bytes are returned untouched.
pub fn add_fields(
    pdf_bytes: &[u8],
    definitions: &[FieldDefinition],
) -> Result<(Vec<u8>, FieldReport), FormFieldError> {
    let mut doc = load_document(pdf_bytes)?;
    let report = add_to_document(&mut doc, definitions)?;

    if report.applied == 0 {
        return Ok((pdf_bytes.to_vec(), report));
    }

    info!(
        "Added {} field(s), skipped {}",
        report.applied, report.skipped
    );
    let output = save_document(&mut doc)?;
    Ok((output, report))
}

/// Add fields to an already loaded document.
pub fn add_to_document(
    doc: &mut Document,
    definitions: &[FieldDefinition],
) -> Result<FieldReport, FormFieldError> {
    let pages: BTreeMap<u32, ObjectId> = doc.get_pages();
    let page_count = pages.len();

    // A new top-level field may not reuse a full name or any parent's name
    let mut taken: HashSet<String> = HashSet::new();
    for field in acroform::collect_fields(doc) {
        let mut prefix = field.name.as_str();
        while let Some((parent, _)) = prefix.rsplit_once('.') {
            taken.insert(parent.to_string());
            prefix = parent;
        }
        taken.insert(field.name);
    }

    let mut report = FieldReport::new();
    let mut form: Option<(ObjectId, ObjectId)> = None;

    for def in definitions {
        let name = def.field_name.trim().to_string();
        // get_pages is keyed by 1-based page number
        let page_id = def
            .page()
            .and_then(|index| u32::try_from(index).ok())
            .and_then(|index| index.checked_add(1))
            .and_then(|number| pages.get(&number))
            .copied();

        let rejection = if name.is_empty() {
            Some(SkipReason::EmptyName)
        } else if page_id.is_none() {
            Some(SkipReason::PageOutOfRange {
                page_index: def.page_index,
                page_count,
            })
        } else if !def.rect().is_well_formed() {
            Some(SkipReason::InvalidGeometry)
        } else if taken.contains(&name) {
            Some(SkipReason::DuplicateName)
        } else {
            None
        };

        if let Some(reason) = rejection {
            warn!("Skipping field \"{}\": {}", name, reason);
            report.skipped(name, reason);
            continue;
        }
        let Some(page_id) = page_id else {
            continue;
        };

        let (form_id, font_id) = match form {
            Some(ids) => ids,
            None => {
                let form_id = acroform::ensure_acroform(doc)?;
                let font_id = acroform::ensure_form_font(doc, form_id)?;
                ensure_default_appearance(doc, form_id)?;
                form = Some((form_id, font_id));
                (form_id, font_id)
            }
        };

        let field_id = create_text_field(doc, def, &name, page_id, font_id)?;
        acroform::add_annotation_to_page(doc, page_id, field_id)?;
        acroform::push_to_array(doc, form_id, b"Fields", Object::Reference(field_id))?;
        debug!(
            "Added field \"{}\" on page {} at [{}, {}, {}x{}]",
            name, def.page_index, def.x, def.y, def.width, def.height
        );
        taken.insert(name.clone());
        report.applied(name);
    }

    if let Some((form_id, _)) = form {
        acroform::set_need_appearances(doc, form_id)?;
    }
    Ok(report)
}

fn ensure_default_appearance(doc: &mut Document, form_id: ObjectId) -> Result<(), FormFieldError> {
    let form = doc.get_dictionary_mut(form_id)?;
    if !form.has(b"DA") {
        form.set("DA", Object::string_literal(DEFAULT_APPEARANCE));
    }
    Ok(())
}

/// Build the merged field/widget dictionary and its appearance stream.
fn create_text_field(
    doc: &mut Document,
    def: &FieldDefinition,
    name: &str,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<ObjectId, FormFieldError> {
    let rect = def.rect();
    let style = FieldStyle::ADDED;
    let default_value = def.effective_default();

    let appearance = build_text_appearance(
        doc,
        font_id,
        rect.width as f32,
        rect.height as f32,
        default_value.unwrap_or(""),
        def.multiline,
        &style,
    )?;

    let mut field = Dictionary::new();
    field.set("Type", Object::Name(b"Annot".to_vec()));
    field.set("Subtype", Object::Name(b"Widget".to_vec()));
    field.set("FT", Object::Name(b"Tx".to_vec()));
    field.set("T", encode_text_string(name));
    field.set("Rect", rect.to_pdf_array());
    field.set("P", Object::Reference(page_id));
    field.set("F", Object::Integer(ANNOT_FLAG_PRINT));
    field.set("DA", Object::string_literal(DEFAULT_APPEARANCE));
    field.set("MK", style.characteristics());
    field.set("BS", style.border_style());
    field.set("AP", dictionary! { "N" => Object::Reference(appearance) });
    if def.multiline {
        field.set("Ff", Object::Integer(FLAG_MULTILINE));
    }
    if let Some(value) = default_value {
        field.set("V", encode_text_string(value));
        field.set("DV", encode_text_string(value));
    }

    Ok(doc.add_object(field))
}

//! Read back the fields of an existing form

use std::collections::BTreeMap;

use lopdf::{Document, Object, ObjectId};

use crate::acroform::{self, FieldNode};
use crate::error::FormFieldError;
use crate::text::decode_text_string;
use crate::types::{FieldKind, FormFieldInfo, PdfRect};
use crate::validation::load_document;

/// List every terminal field in the form, in form order.
pub fn list_fields(pdf_bytes: &[u8]) -> Result<Vec<FormFieldInfo>, FormFieldError> {
    let doc = load_document(pdf_bytes)?;
    Ok(document_fields(&doc))
}

pub fn document_fields(doc: &Document) -> Vec<FormFieldInfo> {
    let pages = acroform::page_indices(doc);
    let annotated = annotation_pages(doc);

    acroform::collect_fields(doc)
        .into_iter()
        .map(|node| field_info(doc, &node, &pages, &annotated))
        .collect()
}

/// Widget id to page index, from each page's `Annots`
fn annotation_pages(doc: &Document) -> BTreeMap<ObjectId, usize> {
    let mut out = BTreeMap::new();
    for (number, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let annots = match page.get(b"Annots") {
            Ok(Object::Array(items)) => items.as_slice(),
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(items)) => items.as_slice(),
                _ => continue,
            },
            _ => continue,
        };
        for annot in annots {
            if let Ok(id) = annot.as_reference() {
                out.entry(id).or_insert(number as usize - 1);
            }
        }
    }
    out
}

fn field_info(
    doc: &Document,
    node: &FieldNode,
    pages: &BTreeMap<ObjectId, usize>,
    annotated: &BTreeMap<ObjectId, usize>,
) -> FormFieldInfo {
    let widget = node
        .widgets
        .first()
        .and_then(|id| doc.get_dictionary(*id).ok().map(|dict| (*id, dict)));

    let page_index = widget.and_then(|(id, dict)| {
        dict.get(b"P")
            .and_then(Object::as_reference)
            .ok()
            .and_then(|page| pages.get(&page).copied())
            .or_else(|| annotated.get(&id).copied())
    });

    let rect = widget.and_then(|(_, dict)| match dict.get(b"Rect") {
        Ok(Object::Array(items)) => PdfRect::from_pdf_array(items),
        _ => None,
    });

    let value = doc
        .get_dictionary(node.id)
        .ok()
        .and_then(|dict| match dict.get(b"V") {
            Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
            _ => None,
        });

    FormFieldInfo {
        name: node.name.clone(),
        kind: FieldKind::from_pdf_name(node.field_type.as_deref()),
        page_index,
        rect,
        value,
        multiline: node.is_text() && node.is_multiline(),
    }
}

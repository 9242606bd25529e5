//! AcroForm dictionary access and the field tree
//!
//! Entries such as `AcroForm`, `Fields`, `DR` and `Annots` may be stored
//! inline or as indirect references; the helpers here resolve both shapes.

use std::collections::{BTreeMap, HashSet};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use crate::error::FormFieldError;
use crate::text::decode_text_string;

/// Resource name of the font used in default appearances
pub const FONT_RESOURCE: &str = "Helv";

/// Default appearance string for generated text fields
pub const DEFAULT_APPEARANCE: &str = "/Helv 12 Tf 0 g";

/// `Ff` bit 13: text field accepts multiple lines
pub const FLAG_MULTILINE: i64 = 1 << 12;

/// Guards against pathological or cyclic `Kids` chains
const MAX_FIELD_DEPTH: usize = 32;

/// A terminal field found while walking the form
#[derive(Debug, Clone)]
pub(crate) struct FieldNode {
    pub id: ObjectId,
    /// Fully qualified name
    pub name: String,
    /// Inherited `FT` value
    pub field_type: Option<Vec<u8>>,
    /// Inherited `Ff` value
    pub flags: i64,
    /// Widget annotations carrying the field's rectangles
    pub widgets: Vec<ObjectId>,
}

impl FieldNode {
    pub fn is_text(&self) -> bool {
        self.field_type.as_deref() == Some(b"Tx".as_slice())
    }

    pub fn is_multiline(&self) -> bool {
        self.flags & FLAG_MULTILINE != 0
    }

    pub fn type_name(&self) -> String {
        self.field_type
            .as_deref()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .unwrap_or_else(|| "none".to_string())
    }
}

pub(crate) fn catalog_id(doc: &Document) -> Result<ObjectId, FormFieldError> {
    Ok(doc.trailer.get(b"Root")?.as_reference()?)
}

/// Id of the AcroForm dictionary, if the catalog has one stored indirectly.
///
/// Inline AcroForms are moved into their own object so later edits can
/// address them by id.
fn acroform_id(doc: &mut Document) -> Result<Option<ObjectId>, FormFieldError> {
    let catalog_id = catalog_id(doc)?;
    let inline = match doc.get_dictionary(catalog_id)?.get(b"AcroForm") {
        Ok(Object::Reference(id)) => return Ok(Some(*id)),
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => return Ok(None),
    };

    let id = doc.add_object(inline);
    doc.get_dictionary_mut(catalog_id)?
        .set("AcroForm", Object::Reference(id));
    Ok(Some(id))
}

/// The AcroForm dictionary, resolving a reference if needed.
pub(crate) fn acroform(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.get_dictionary(catalog_id(doc).ok()?).ok()?;
    match catalog.get(b"AcroForm").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Find or create the AcroForm and return its id.
pub(crate) fn ensure_acroform(doc: &mut Document) -> Result<ObjectId, FormFieldError> {
    if let Some(id) = acroform_id(doc)? {
        return Ok(id);
    }

    let id = doc.add_object(dictionary! {
        "Fields" => Vec::<Object>::new(),
        "DA" => Object::string_literal(DEFAULT_APPEARANCE),
    });
    let catalog_id = catalog_id(doc)?;
    doc.get_dictionary_mut(catalog_id)?
        .set("AcroForm", Object::Reference(id));
    Ok(id)
}

/// Ask viewers to regenerate field appearances.
pub(crate) fn set_need_appearances(
    doc: &mut Document,
    acroform_id: ObjectId,
) -> Result<(), FormFieldError> {
    doc.get_dictionary_mut(acroform_id)?
        .set("NeedAppearances", Object::Boolean(true));
    Ok(())
}

/// Reference stored under `key` in the dictionary object `owner`, if indirect.
fn indirect_entry(doc: &Document, owner: ObjectId, key: &[u8]) -> Option<ObjectId> {
    match doc.get_dictionary(owner).ok()?.get(key) {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    }
}

/// Mutable access to the dictionary stored under `key` in `owner`,
/// creating an empty inline dictionary when absent.
fn child_dict_mut<'a>(
    doc: &'a mut Document,
    owner: ObjectId,
    key: &[u8],
) -> Result<&'a mut Dictionary, FormFieldError> {
    if let Some(id) = indirect_entry(doc, owner, key) {
        return Ok(doc.get_dictionary_mut(id)?);
    }

    let dict = doc.get_dictionary_mut(owner)?;
    if !matches!(dict.get(key), Ok(Object::Dictionary(_))) {
        dict.set(key.to_vec(), Dictionary::new());
    }
    Ok(dict.get_mut(key)?.as_dict_mut()?)
}

/// Append `item` to the array stored under `key` in `owner`,
/// creating the array when absent.
pub(crate) fn push_to_array(
    doc: &mut Document,
    owner: ObjectId,
    key: &[u8],
    item: Object,
) -> Result<(), FormFieldError> {
    if let Some(id) = indirect_entry(doc, owner, key) {
        doc.get_object_mut(id)?.as_array_mut()?.push(item);
        return Ok(());
    }

    let dict = doc.get_dictionary_mut(owner)?;
    if !matches!(dict.get(key), Ok(Object::Array(_))) {
        dict.set(key.to_vec(), Vec::<Object>::new());
    }
    dict.get_mut(key)?.as_array_mut()?.push(item);
    Ok(())
}

/// Id of the Helvetica font registered in the AcroForm default resources,
/// adding it when missing.
pub(crate) fn ensure_form_font(
    doc: &mut Document,
    acroform_id: ObjectId,
) -> Result<ObjectId, FormFieldError> {
    let existing = {
        let resources = match indirect_entry(doc, acroform_id, b"DR") {
            Some(id) => doc.get_dictionary(id).ok(),
            None => doc
                .get_dictionary(acroform_id)?
                .get(b"DR")
                .and_then(Object::as_dict)
                .ok(),
        };
        resources
            .and_then(|dr| dr.get(b"Font").ok())
            .and_then(|fonts| match fonts {
                Object::Reference(id) => doc.get_dictionary(*id).ok(),
                Object::Dictionary(dict) => Some(dict),
                _ => None,
            })
            .and_then(|fonts| fonts.get(FONT_RESOURCE.as_bytes()).ok())
            .and_then(|font| font.as_reference().ok())
    };
    if let Some(id) = existing {
        return Ok(id);
    }

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let dr_id = match indirect_entry(doc, acroform_id, b"DR") {
        Some(id) => id,
        None => {
            let resources = child_dict_mut(doc, acroform_id, b"DR")?.clone();
            let id = doc.add_object(resources);
            doc.get_dictionary_mut(acroform_id)?
                .set("DR", Object::Reference(id));
            id
        }
    };
    child_dict_mut(doc, dr_id, b"Font")?.set(FONT_RESOURCE, Object::Reference(font_id));

    Ok(font_id)
}

/// Walk the form and return every terminal field with its qualified name.
pub(crate) fn collect_fields(doc: &Document) -> Vec<FieldNode> {
    let mut out = Vec::new();
    let Some(form) = acroform(doc) else {
        return out;
    };

    let roots = match form.get(b"Fields") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let mut visited = HashSet::new();
    for root in roots {
        if let Object::Reference(id) = root {
            visit_field(doc, id, "", None, 0, 0, &mut visited, &mut out);
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn visit_field(
    doc: &Document,
    id: ObjectId,
    parent_name: &str,
    inherited_type: Option<&[u8]>,
    inherited_flags: i64,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<FieldNode>,
) {
    if depth > MAX_FIELD_DEPTH || !visited.insert(id) {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };

    let name = match dict.get(b"T") {
        Ok(Object::String(bytes, _)) => {
            let partial = decode_text_string(bytes);
            if parent_name.is_empty() {
                partial
            } else {
                format!("{}.{}", parent_name, partial)
            }
        }
        _ => parent_name.to_string(),
    };
    let field_type = match dict.get(b"FT") {
        Ok(Object::Name(ft)) => Some(ft.as_slice()),
        _ => inherited_type,
    };
    let flags = dict
        .get(b"Ff")
        .and_then(Object::as_i64)
        .unwrap_or(inherited_flags);

    let kids: Vec<ObjectId> = match dict.get(b"Kids") {
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|k| k.as_reference().ok())
            .collect(),
        _ => Vec::new(),
    };

    let before = out.len();
    let mut widgets = Vec::new();
    for kid in kids {
        let is_child_field = doc
            .get_dictionary(kid)
            .map(|k| k.has(b"T"))
            .unwrap_or(false);
        if is_child_field {
            visit_field(doc, kid, &name, field_type, flags, depth + 1, visited, out);
        } else {
            widgets.push(kid);
        }
    }

    let has_child_fields = out.len() > before;
    if widgets.is_empty() && !has_child_fields {
        // Field and widget merged into one dictionary
        widgets.push(id);
    }
    if !widgets.is_empty() && !name.is_empty() {
        out.push(FieldNode {
            id,
            name,
            field_type: field_type.map(<[u8]>::to_vec),
            flags,
            widgets,
        });
    }
}

/// Map each page object id to its 0-based index.
pub(crate) fn page_indices(doc: &Document) -> BTreeMap<ObjectId, usize> {
    doc.get_pages()
        .into_iter()
        .map(|(number, id)| (id, number as usize - 1))
        .collect()
}

/// Append an annotation reference to a page's `Annots`.
pub(crate) fn add_annotation_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    annot_id: ObjectId,
) -> Result<(), FormFieldError> {
    push_to_array(doc, page_id, b"Annots", Object::Reference(annot_id))
}

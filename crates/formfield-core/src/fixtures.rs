//! In-memory PDFs for tests

use std::collections::BTreeMap;

use lopdf::{dictionary, Document, Object, ObjectId};

use crate::text::encode_text_string;
use crate::types::PdfRect;

/// A pre-existing form field placed into a fixture document
#[derive(Debug, Clone)]
pub struct FixtureField {
    pub name: String,
    pub page_index: usize,
    pub field_type: &'static str,
    pub rect: PdfRect,
    pub value: Option<String>,
    /// Partial name of a non-terminal parent field
    pub parent: Option<String>,
}

impl FixtureField {
    pub fn text(name: &str, page_index: usize) -> Self {
        Self {
            name: name.to_string(),
            page_index,
            field_type: "Tx",
            rect: PdfRect::new(72.0, 700.0, 200.0, 20.0),
            value: None,
            parent: None,
        }
    }

    pub fn checkbox(name: &str, page_index: usize) -> Self {
        Self {
            field_type: "Btn",
            rect: PdfRect::new(72.0, 650.0, 12.0, 12.0),
            ..Self::text(name, page_index)
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn at(mut self, rect: PdfRect) -> Self {
        self.rect = rect;
        self
    }
}

/// Returns the page ids and the catalog id
fn build_pages(doc: &mut Document, page_count: usize) -> (Vec<ObjectId>, ObjectId) {
    let pages_id = doc.new_object_id();

    let page_ids: Vec<ObjectId> = (0..page_count)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            })
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => Object::Integer(page_count as i64),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    (page_ids, catalog_id)
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("fixture PDF should serialize");
    buffer
}

/// A PDF with `page_count` empty US Letter pages and no form.
pub fn blank_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    build_pages(&mut doc, page_count);
    save(doc)
}

/// A PDF whose AcroForm holds the given fields.
pub fn form_pdf(fields: &[FixtureField]) -> Vec<u8> {
    let page_count = fields
        .iter()
        .map(|f| f.page_index + 1)
        .max()
        .unwrap_or(1);

    let mut doc = Document::with_version("1.7");
    let (page_ids, catalog_id) = build_pages(&mut doc, page_count);

    let mut root_fields: Vec<Object> = Vec::new();
    let mut parents: BTreeMap<String, (ObjectId, Vec<Object>)> = BTreeMap::new();
    let mut annots: BTreeMap<usize, Vec<Object>> = BTreeMap::new();

    for field in fields {
        let page_id = page_ids[field.page_index];
        let mut dict = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => Object::Name(field.field_type.as_bytes().to_vec()),
            "T" => encode_text_string(&field.name),
            "Rect" => field.rect.to_pdf_array(),
            "P" => Object::Reference(page_id),
        };
        if let Some(value) = &field.value {
            dict.set("V", encode_text_string(value));
        }

        let field_id = doc.new_object_id();
        match &field.parent {
            Some(parent) => {
                let entry = parents
                    .entry(parent.clone())
                    .or_insert_with(|| (doc.new_object_id(), Vec::new()));
                dict.set("Parent", Object::Reference(entry.0));
                entry.1.push(Object::Reference(field_id));
            }
            None => root_fields.push(Object::Reference(field_id)),
        }
        doc.objects.insert(field_id, Object::Dictionary(dict));
        annots
            .entry(field.page_index)
            .or_default()
            .push(Object::Reference(field_id));
    }

    for (name, (parent_id, kids)) in parents {
        doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "T" => encode_text_string(&name),
                "Kids" => kids,
            }),
        );
        root_fields.push(Object::Reference(parent_id));
    }

    for (page_index, refs) in annots {
        if let Ok(page) = doc.get_dictionary_mut(page_ids[page_index]) {
            page.set("Annots", refs);
        }
    }

    let acroform_id = doc.add_object(dictionary! {
        "Fields" => root_fields,
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
    });
    if let Ok(catalog) = doc.get_dictionary_mut(catalog_id) {
        catalog.set("AcroForm", Object::Reference(acroform_id));
    }

    save(doc)
}

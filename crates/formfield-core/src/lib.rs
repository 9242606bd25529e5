//! AcroForm text field filling and creation
//!
//! Two operations are provided, both taking raw PDF bytes and returning the
//! rewritten document together with a per-field [`FieldReport`]:
//! - [`fill_fields`]: write values into text fields that already exist
//! - [`add_fields`]: create new text fields at page rectangles
//!
//! Problems with individual fields never fail the whole operation; they are
//! skipped, logged and recorded in the report.

mod acroform;
pub mod add;
pub mod appearance;
pub mod error;
pub mod fill;
pub mod inspect;
pub mod text;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use add::add_fields;
pub use error::FormFieldError;
pub use fill::fill_fields;
pub use inspect::list_fields;
pub use types::{
    parse_field_definitions, parse_fill_map, FieldDefinition, FieldKind, FieldOutcome,
    FieldReport, FillMap, FormFieldInfo, PdfRect, SkipReason,
};
pub use validation::{pdf_info, quick_validate, PdfInfo};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, FormFieldError> {
    let doc = validation::load_document(bytes)?;
    Ok(doc.get_pages().len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(get_page_count(&fixtures::blank_pdf(4)).unwrap(), 4);
    }

    #[test]
    fn test_page_count_rejects_garbage() {
        assert!(get_page_count(b"not a pdf").is_err());
    }

    #[test]
    fn test_add_then_fill() {
        let pdf = fixtures::blank_pdf(1);
        let defs = parse_field_definitions(
            r#"[{"pageIndex":0,"fieldName":"name","x":72,"y":700,"width":200,"height":20}]"#,
        )
        .unwrap();
        let (with_fields, _) = add_fields(&pdf, &defs).unwrap();

        let values = parse_fill_map(r#"{"name":"Priya"}"#).unwrap();
        let (filled, report) = fill_fields(&with_fields, &values).unwrap();

        assert_eq!(report.applied, 1);
        let fields = list_fields(&filled).unwrap();
        assert_eq!(fields[0].value.as_deref(), Some("Priya"));
    }
}

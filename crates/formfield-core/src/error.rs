use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormFieldError {
    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error("Not a PDF file: {0}")]
    NotAPdf(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Malformed PDF structure: {0}")]
    Structure(String),
}

impl FormFieldError {
    /// True when the caller sent something unusable, as opposed to the
    /// document or the PDF library failing underneath us.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FormFieldError::NotAPdf(_) | FormFieldError::InvalidPayload(_)
        )
    }
}

impl From<lopdf::Error> for FormFieldError {
    fn from(err: lopdf::Error) -> Self {
        FormFieldError::Structure(err.to_string())
    }
}

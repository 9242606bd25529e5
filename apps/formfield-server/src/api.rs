//! API handlers for the form field server
//!
//! Provides REST endpoints for:
//! - Filling existing text fields
//! - Adding new fillable text fields
//! - Listing the fields of an uploaded PDF

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use formfield_core::{
    add_fields, fill_fields, list_fields, parse_field_definitions, parse_fill_map, FieldReport,
    FormFieldInfo,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ServerError;
use crate::AppState;

/// Response header carrying the JSON per-field report
pub const FIELD_REPORT_HEADER: &str = "x-field-report";

/// Multipart part names accepted for the uploaded PDF
const PDF_PARTS: &[&str] = &["pdfFile", "file"];
/// Multipart part names accepted for the fill value map
const FILL_PARTS: &[&str] = &["data", "values", "fields"];
/// Multipart part names accepted for new field definitions
const ADD_PARTS: &[&str] = &["fields"];

pub const FILLED_FILENAME: &str = "filled.pdf";
pub const WITH_FIELDS_FILENAME: &str = "pdf_with_new_fields.pdf";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "formfield-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Field list response
#[derive(Serialize)]
pub struct FieldListResponse {
    pub success: bool,
    pub fields: Vec<FormFieldInfo>,
    pub count: usize,
}

/// The parts of an upload form this server understands
#[derive(Debug, Default)]
struct Upload {
    pdf: Option<Bytes>,
    payload: Option<String>,
}

impl Upload {
    fn pdf(&mut self) -> Result<Bytes, ServerError> {
        match self.pdf.take() {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(ServerError::InvalidRequest(
                "No PDF file uploaded".to_string(),
            )),
        }
    }

    fn payload(&mut self, what: &str) -> Result<String, ServerError> {
        self.payload
            .take()
            .ok_or_else(|| ServerError::InvalidRequest(format!("Missing {} in upload", what)))
    }
}

/// Read the PDF part and the first JSON part whose name is in `payload_parts`.
async fn read_upload(
    mut multipart: Multipart,
    payload_parts: &[&str],
    limit_mb: usize,
) -> Result<Upload, ServerError> {
    let mut upload = Upload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::from_multipart(e, limit_mb))?
    {
        let name = field.name().unwrap_or("").to_string();

        if PDF_PARTS.contains(&name.as_str()) {
            if upload.pdf.is_none() {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::from_multipart(e, limit_mb))?;
                debug!("Received PDF part '{}' ({} bytes)", name, bytes.len());
                upload.pdf = Some(bytes);
            }
        } else if payload_parts.contains(&name.as_str()) {
            if upload.payload.is_none() {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::from_multipart(e, limit_mb))?;
                debug!("Received payload part '{}' ({} bytes)", name, text.len());
                upload.payload = Some(text);
            }
        } else {
            debug!("Ignoring multipart part '{}'", name);
        }
    }

    Ok(upload)
}

/// Encode the report as a header value.
///
/// Header values only admit visible ASCII, so everything else (non-ASCII,
/// and DEL which serde_json leaves raw) becomes a `\uXXXX` escape.
pub fn report_header(report: &FieldReport) -> Result<HeaderValue, ServerError> {
    let json = serde_json::to_string(report)
        .map_err(|e| ServerError::Internal(format!("Failed to encode report: {}", e)))?;

    let mut ascii = String::with_capacity(json.len());
    for c in json.chars() {
        if matches!(c, ' '..='~') {
            ascii.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                ascii.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }

    HeaderValue::from_str(&ascii)
        .map_err(|e| ServerError::Internal(format!("Failed to encode report header: {}", e)))
}

/// PDF attachment response with the field report attached as a header.
fn pdf_attachment(
    bytes: Vec<u8>,
    filename: &str,
    report: &FieldReport,
) -> Result<Response, ServerError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
            (
                HeaderName::from_static(FIELD_REPORT_HEADER),
                report_header(report)?,
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Handler: POST /fill-pdf
pub async fn handle_fill_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let mut upload = read_upload(multipart, FILL_PARTS, state.max_upload_mb).await?;
    let pdf = upload.pdf()?;
    let values = parse_fill_map(&upload.payload("field values")?)?;

    info!(
        "Fill request: {} bytes, {} value(s)",
        pdf.len(),
        values.len()
    );
    debug!("Fill values for: {:?}", values.keys().collect::<Vec<_>>());

    let (output, report) =
        tokio::task::spawn_blocking(move || fill_fields(&pdf, &values)).await??;

    info!(
        "Filled {} field(s), skipped {}",
        report.applied, report.skipped
    );
    pdf_attachment(output, FILLED_FILENAME, &report)
}

/// Handler: POST /add-fillable-fields
pub async fn handle_add_fillable_fields(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let mut upload = read_upload(multipart, ADD_PARTS, state.max_upload_mb).await?;
    let pdf = upload.pdf()?;
    let definitions = parse_field_definitions(&upload.payload("field definitions")?)?;

    info!(
        "Add-fields request: {} bytes, {} definition(s)",
        pdf.len(),
        definitions.len()
    );

    let (output, report) =
        tokio::task::spawn_blocking(move || add_fields(&pdf, &definitions)).await??;

    pdf_attachment(output, WITH_FIELDS_FILENAME, &report)
}

/// Handler: POST /list-fields
pub async fn handle_list_fields(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FieldListResponse>, ServerError> {
    let mut upload = read_upload(multipart, &[], state.max_upload_mb).await?;
    let pdf = upload.pdf()?;

    info!("List-fields request: {} bytes", pdf.len());

    let fields = tokio::task::spawn_blocking(move || list_fields(&pdf)).await??;
    let count = fields.len();

    Ok(Json(FieldListResponse {
        success: true,
        fields,
        count,
    }))
}

//! Router tests driven through `tower::ServiceExt::oneshot`

use std::io::Write;
use std::path::PathBuf;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use formfield_core::fixtures::{self, FixtureField};
use formfield_core::{list_fields, FieldReport, SkipReason};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::api::FIELD_REPORT_HEADER;
use crate::{build_router, AppState};

const BOUNDARY: &str = "----FormFieldBoundary7MA4YWxkTrZu0gW";

fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../formfield-web/www")
}

fn app_with_limit(max_upload_mb: usize) -> Router {
    build_router(AppState {
        max_upload_mb,
        static_dir: static_dir(),
    })
}

fn app() -> Router {
    app_with_limit(25)
}

enum Part<'a> {
    File(&'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

/// Build a multipart/form-data request
fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();

    for part in parts {
        write!(body, "--{}\r\n", BOUNDARY).unwrap();
        match part {
            Part::File(name, bytes) => {
                write!(
                    body,
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.pdf\"\r\n",
                    name
                )
                .unwrap();
                write!(body, "Content-Type: application/pdf\r\n\r\n").unwrap();
                body.extend_from_slice(bytes);
            }
            Part::Text(name, text) => {
                write!(
                    body,
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )
                .unwrap();
                body.extend_from_slice(text.as_bytes());
            }
        }
        write!(body, "\r\n").unwrap();
    }
    write!(body, "--{}--\r\n", BOUNDARY).unwrap();

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn report_of(response: &Response) -> FieldReport {
    let header = response
        .headers()
        .get(FIELD_REPORT_HEADER)
        .expect("report header present");
    serde_json::from_str(header.to_str().unwrap()).unwrap()
}

fn sample_form() -> Vec<u8> {
    fixtures::form_pdf(&[
        FixtureField::text("name", 0),
        FixtureField::text("city", 0),
    ])
}

#[tokio::test]
async fn test_health_check() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "formfield-server");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_fill_pdf_returns_filled_attachment() {
    let pdf = sample_form();
    let data = json!({"name": "Hansraj", "city": "Delhi"}).to_string();
    let request = multipart_request(
        "/fill-pdf",
        &[Part::File("pdfFile", &pdf), Part::Text("data", &data)],
    );

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    assert!(response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("filled.pdf"));
    assert_eq!(report_of(&response).applied, 2);

    let body = body_bytes(response).await;
    assert!(body.starts_with(b"%PDF"));
    let values: Vec<Option<String>> = list_fields(&body)
        .unwrap()
        .into_iter()
        .map(|f| f.value)
        .collect();
    assert_eq!(
        values,
        vec![Some("Hansraj".to_string()), Some("Delhi".to_string())]
    );
}

#[tokio::test]
async fn test_fill_unknown_field_returns_original() {
    let pdf = sample_form();
    let request = multipart_request(
        "/fill-pdf",
        &[
            Part::File("pdfFile", &pdf),
            Part::Text("data", r#"{"nickname":"Raju"}"#),
        ],
    );

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = report_of(&response);
    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped_names(), vec!["nickname"]);
    assert_eq!(body_bytes(response).await, pdf);
}

#[tokio::test]
async fn test_fill_with_delete_char_in_key_still_succeeds() {
    let pdf = sample_form();
    let data = json!({"name": "Hansraj", "bad\u{7f}key": "x"}).to_string();
    let request = multipart_request(
        "/fill-pdf",
        &[Part::File("pdfFile", &pdf), Part::Text("data", &data)],
    );

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = report_of(&response);
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped_names(), vec!["bad\u{7f}key"]);
}

#[tokio::test]
async fn test_fill_accepts_part_aliases() {
    let pdf = sample_form();
    let request = multipart_request(
        "/fill-pdf",
        &[
            Part::Text("values", r#"{"city":42}"#),
            Part::File("file", &pdf),
        ],
    );

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    let city = list_fields(&body)
        .unwrap()
        .into_iter()
        .find(|f| f.name == "city")
        .unwrap();
    assert_eq!(city.value.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_fill_without_file_is_bad_request() {
    let request = multipart_request("/fill-pdf", &[Part::Text("data", r#"{"name":"x"}"#)]);

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_fill_with_empty_file_is_bad_request() {
    let request = multipart_request(
        "/fill-pdf",
        &[
            Part::File("pdfFile", b""),
            Part::Text("data", r#"{"name":"x"}"#),
        ],
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fill_with_malformed_json_is_bad_request() {
    let pdf = sample_form();
    for data in ["{not json", "[]", "{}", ""] {
        let request = multipart_request(
            "/fill-pdf",
            &[Part::File("pdfFile", &pdf), Part::Text("data", data)],
        );

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "payload {:?}", data);
        assert_eq!(body_json(response).await["code"], "INVALID_PAYLOAD");
    }
}

#[tokio::test]
async fn test_fill_without_payload_is_bad_request() {
    let pdf = sample_form();
    let request = multipart_request("/fill-pdf", &[Part::File("pdfFile", &pdf)]);

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_pdf_upload_is_bad_request() {
    let request = multipart_request(
        "/fill-pdf",
        &[
            Part::File("pdfFile", b"GIF89a definitely not a pdf"),
            Part::Text("data", r#"{"name":"x"}"#),
        ],
    );

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "NOT_A_PDF");
}

#[tokio::test]
async fn test_unparseable_pdf_is_server_error() {
    let request = multipart_request(
        "/fill-pdf",
        &[
            Part::File("pdfFile", b"%PDF-1.7\n1 0 obj\n<<"),
            Part::Text("data", r#"{"name":"x"}"#),
        ],
    );

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PDF_ERROR");
    assert!(json["error"].as_str().unwrap().contains("Failed to load PDF"));
}

#[tokio::test]
async fn test_add_fillable_fields_skips_out_of_range_page() {
    let pdf = fixtures::blank_pdf(1);
    let fields = json!([
        {"pageIndex": 0, "fieldName": "full_name", "x": 72, "y": 700, "width": 200, "height": 20},
        {"pageIndex": 3, "fieldName": "ghost", "x": 72, "y": 650, "width": 200, "height": 20},
        {"pageIndex": 0, "fieldName": "notes", "x": 72, "y": 400, "width": 300, "height": 120,
         "multiline": true, "defaultValue": "n/a"}
    ])
    .to_string();
    let request = multipart_request(
        "/add-fillable-fields",
        &[Part::File("pdfFile", &pdf), Part::Text("fields", &fields)],
    );

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("pdf_with_new_fields.pdf"));

    let report = report_of(&response);
    assert_eq!(report.applied, 2);
    assert!(matches!(
        &report.outcomes[1],
        formfield_core::FieldOutcome::Skipped {
            reason: SkipReason::PageOutOfRange { page_index: 3, page_count: 1 },
            ..
        }
    ));

    let body = body_bytes(response).await;
    let names: Vec<String> = list_fields(&body)
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["full_name", "notes"]);
}

#[tokio::test]
async fn test_add_fillable_fields_skips_negative_page() {
    let pdf = fixtures::blank_pdf(1);
    let fields = json!([
        {"pageIndex": -1, "fieldName": "before_first", "x": 72, "y": 700, "width": 200, "height": 20},
        {"pageIndex": 0, "fieldName": "kept", "x": 72, "y": 650, "width": 200, "height": 20}
    ])
    .to_string();
    let request = multipart_request(
        "/add-fillable-fields",
        &[Part::File("pdfFile", &pdf), Part::Text("fields", &fields)],
    );

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = report_of(&response);
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped_names(), vec!["before_first"]);

    let body = body_bytes(response).await;
    let names: Vec<String> = list_fields(&body)
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["kept"]);
}

#[tokio::test]
async fn test_add_fillable_fields_requires_definitions() {
    let pdf = fixtures::blank_pdf(1);

    let missing = multipart_request("/add-fillable-fields", &[Part::File("pdfFile", &pdf)]);
    let response = app().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let wrong_shape = multipart_request(
        "/add-fillable-fields",
        &[
            Part::File("pdfFile", &pdf),
            Part::Text("fields", r#"{"fieldName":"x"}"#),
        ],
    );
    let response = app().oneshot(wrong_shape).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_PAYLOAD");
}

#[tokio::test]
async fn test_list_fields() {
    let pdf = fixtures::form_pdf(&[
        FixtureField::text("name", 0).with_value("Mohan"),
        FixtureField::checkbox("agree", 0),
    ]);
    let request = multipart_request("/list-fields", &[Part::File("pdfFile", &pdf)]);

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 2);
    assert_eq!(json["fields"][0]["name"], "name");
    assert_eq!(json["fields"][0]["value"], "Mohan");
    assert_eq!(json["fields"][1]["kind"], "Button");
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let mut pdf = fixtures::blank_pdf(1);
    pdf.resize(pdf.len() + 2 * 1024 * 1024, b' ');
    let request = multipart_request(
        "/fill-pdf",
        &[
            Part::File("pdfFile", &pdf),
            Part::Text("data", r#"{"name":"x"}"#),
        ],
    );

    let response = app_with_limit(1).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_static_fallback_serves_ui() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/index.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("pdf-canvas"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/no-such-asset.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

mod property_tests {
    use proptest::prelude::*;

    use formfield_core::{FieldReport, FormFieldError, SkipReason};

    use crate::api::report_header;
    use crate::error::ServerError;

    fn core_error() -> impl Strategy<Value = FormFieldError> {
        ("[a-z ]{0,20}", 0..5u8).prop_map(|(msg, kind)| match kind {
            0 => FormFieldError::Load(msg),
            1 => FormFieldError::Save(msg),
            2 => FormFieldError::NotAPdf(msg),
            3 => FormFieldError::InvalidPayload(msg),
            _ => FormFieldError::Structure(msg),
        })
    }

    proptest! {
        /// Any field name survives the trip through the report header
        #[test]
        fn report_header_round_trips(
            applied in prop::collection::vec("[\\PC\\x7f]{0,24}", 0..4),
            skipped in prop::collection::vec("[\\PC\\x7f]{0,24}", 0..4),
        ) {
            let mut report = FieldReport::new();
            for name in &applied {
                report.applied(name.as_str());
            }
            for name in &skipped {
                report.skipped(name.as_str(), SkipReason::NotFound);
            }

            let value = report_header(&report).unwrap();
            let text = value.to_str().unwrap();
            prop_assert!(text.is_ascii());

            let decoded: FieldReport = serde_json::from_str(text).unwrap();
            prop_assert_eq!(decoded, report);
        }

        /// Caller mistakes are 4xx, library failures are 5xx
        #[test]
        fn core_errors_split_by_blame(err in core_error()) {
            let client = err.is_client_error();
            let status = ServerError::from(err).status();
            prop_assert_eq!(status.is_client_error(), client);
            prop_assert_eq!(status.is_server_error(), !client);
        }
    }
}

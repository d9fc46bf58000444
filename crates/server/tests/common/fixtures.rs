//! Request helpers and test data.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Boundary used by [`multipart_request`].
const BOUNDARY: &str = "tabula-test-boundary";

/// Send a request and decode the JSON response body.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let (status, _, bytes) = send(router, request).await;

    let json: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Send a request and return status, content type and raw body.
#[allow(dead_code)]
pub async fn send(
    router: &axum::Router,
    request: Request<Body>,
) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, content_type, body_bytes.to_vec())
}

/// Build a multipart upload with a single file part.
#[allow(dead_code)]
pub fn multipart_request(
    uri: &str,
    field: &str,
    file_name: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A column entry for request bodies.
#[allow(dead_code)]
pub fn column(name: &str, ty: &str, not_null: bool) -> Value {
    json!({ "name": name, "type": ty, "notNull": not_null })
}

/// Create a site and return its id.
#[allow(dead_code)]
pub async fn create_site(router: &axum::Router, name: &str) -> i64 {
    let (status, body) =
        json_request(router, "POST", "/v1/sites", Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

/// Create a table and return its physical identifier.
#[allow(dead_code)]
pub async fn create_table(
    router: &axum::Router,
    site_id: i64,
    name: &str,
    columns: Vec<Value>,
) -> String {
    let (status, body) = json_request(
        router,
        "POST",
        &format!("/v1/sites/{site_id}/tables"),
        Some(json!({ "table_name": name, "columns": columns })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["table_id"].as_str().unwrap().to_string()
}

/// Insert a record and return its id.
#[allow(dead_code)]
pub async fn create_record(
    router: &axum::Router,
    site_id: i64,
    table_id: &str,
    fields: Value,
) -> i64 {
    let (status, body) = json_request(
        router,
        "POST",
        &format!("/v1/sites/{site_id}/tables/{table_id}/records"),
        Some(fields),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

/// Minimal PNG signature bytes; the server does not decode images.
#[allow(dead_code)]
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0]
}

//! File upload, listing, download and deletion.
//!
//! Uploads accept either `multipart/form-data` with a `file` part or a raw
//! body named by the `X-Filename` header.

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request, State},
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiResult,
    extractors::ApiPath,
    middleware::{CurrentSession, SelectedStorage},
    response::ApiResponse,
};
use tidepool_core::files::{FileRecord, FileService, UploadInput, default_filename};
use tidepool_core::storage::DEFAULT_CONTENT_TYPE;
use tidepool_shared::AppError;

/// Header naming a raw-body upload.
pub const X_FILENAME: HeaderName = HeaderName::from_static("x-filename");

/// Creates the files router, mounted at `/api/files`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_files).post(upload_file))
        .route("/{*key}", get(download_file).delete(delete_file))
}

/// A stored file as listed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    /// Row ID.
    pub id: Uuid,
    /// Storage key.
    pub key: String,
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Upload time.
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileSummary {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            key: record.key,
            filename: record.filename,
            mime_type: record.mime_type,
            size: record.size,
            created_at: record.created_at,
        }
    }
}

/// Response of a completed upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Row ID.
    pub id: Uuid,
    /// Storage key.
    pub key: String,
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// URL reported by the backend.
    pub url: String,
    /// Upload time.
    pub created_at: DateTime<Utc>,
}

struct ParsedUpload {
    filename: String,
    content_type: String,
    data: Bytes,
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case("multipart/form-data"))
}

async fn read_multipart(request: Request, state: &AppState) -> ApiResult<ParsedUpload> {
    let mut multipart = Multipart::from_request(request, state).await?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map_or_else(default_filename, str::to_owned);
        let content_type = field
            .content_type()
            .map_or_else(|| DEFAULT_CONTENT_TYPE.to_owned(), str::to_owned);
        let data = field.bytes().await?;
        return Ok(ParsedUpload {
            filename,
            content_type,
            data,
        });
    }
    Err(AppError::bad_request("MISSING_FILE", "No file provided").into())
}

async fn read_raw(request: Request, state: &AppState) -> ApiResult<ParsedUpload> {
    let (filename, content_type) = {
        let header = |name: &HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        (
            header(&X_FILENAME).unwrap_or_else(default_filename),
            header(&CONTENT_TYPE).unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned()),
        )
    };
    let data = Bytes::from_request(request, state).await?;
    Ok(ParsedUpload {
        filename,
        content_type,
        data,
    })
}

async fn upload_file(
    State(state): State<AppState>,
    session: CurrentSession,
    SelectedStorage(storage): SelectedStorage,
    request: Request,
) -> ApiResult<ApiResponse<UploadResponse>> {
    let parsed = if is_multipart(request.headers()) {
        read_multipart(request, &state).await?
    } else {
        read_raw(request, &state).await?
    };

    let uploaded = FileService::new(storage, state.files.clone())
        .upload(UploadInput {
            filename: parsed.filename,
            content_type: parsed.content_type,
            data: parsed.data.into(),
            user_id: session.user_id(),
        })
        .await?;

    let record = uploaded.record;
    Ok(ApiResponse::created(UploadResponse {
        id: record.id,
        key: record.key,
        filename: record.filename,
        mime_type: record.mime_type,
        size: record.size,
        url: uploaded.url,
        created_at: record.created_at,
    }))
}

async fn list_files(
    State(state): State<AppState>,
    session: CurrentSession,
    SelectedStorage(storage): SelectedStorage,
) -> ApiResult<ApiResponse<Vec<FileSummary>>> {
    let records = FileService::new(storage, state.files.clone())
        .list(session.user_id())
        .await?;
    Ok(ApiResponse::ok(
        records.into_iter().map(FileSummary::from).collect(),
    ))
}

/// Quoted-string-safe filename for `Content-Disposition`.
fn disposition_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn download_file(
    State(state): State<AppState>,
    SelectedStorage(storage): SelectedStorage,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<Response> {
    let file = FileService::new(storage, state.files.clone())
        .download(&key)
        .await?;

    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&file.download.content_type)
        .unwrap_or(HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers.insert(CONTENT_TYPE, content_type);
    let disposition = format!(
        "inline; filename=\"{}\"",
        disposition_filename(&file.record.filename)
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    if let Some(size) = file.download.size {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    }

    Ok((headers, Body::from_stream(file.download.body)).into_response())
}

async fn delete_file(
    State(state): State<AppState>,
    session: CurrentSession,
    SelectedStorage(storage): SelectedStorage,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<ApiResponse<serde_json::Value>> {
    let record = FileService::new(storage, state.files.clone())
        .delete(&key, session.user_id())
        .await?;
    Ok(ApiResponse::ok(json!({ "deleted": true, "key": record.key })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        BOUNDARY, TestApp, body_bytes, body_json, get, multipart_body,
    };
    use axum::http::{Request, StatusCode};
    use rstest::rstest;
    use tidepool_core::storage::StorageService;

    fn upload(cookie: Option<&str>, filename: &str, data: &[u8]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/files")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        builder
            .body(multipart_body("file", filename, "text/plain", data))
            .unwrap()
    }

    fn delete(cookie: Option<&str>, key: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("DELETE")
            .uri(format!("/api/files/{key}"));
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn uploaded_key(app: &TestApp, request: Request<Body>) -> String {
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"]["key"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let app = TestApp::local();
        let response = app.send(upload(None, "a.txt", b"0123456789")).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        let data = &body["data"];
        let key = data["key"].as_str().unwrap();
        let millis = key
            .strip_prefix("uploads/")
            .and_then(|rest| rest.strip_suffix("-a.txt"))
            .unwrap();
        assert!(!millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(data["size"], 10);
        assert_eq!(data["filename"], "a.txt");
        assert_eq!(data["mimeType"], "text/plain");
        assert_eq!(data["url"], format!("/api/files/{key}"));

        let response = app.send(get(&format!("/api/files/{key}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "inline; filename=\"a.txt\""
        );
        assert_eq!(body_bytes(response).await.as_ref(), b"0123456789");
    }

    #[tokio::test]
    async fn test_upload_then_list_same_session() {
        let app = TestApp::local();
        let cookie = app.sign_up("lister@example.com").await;
        let key = uploaded_key(&app, upload(Some(&cookie), "notes.txt", b"hello")).await;
        // another user's file stays out of the listing
        let other = app.sign_up("other@example.com").await;
        uploaded_key(&app, upload(Some(&other), "notes.txt", b"hi")).await;

        let request = Request::builder()
            .uri("/api/files")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let body = body_json(app.send(request).await).await;
        let files = body["data"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["key"], key.as_str());
        assert!(files[0].get("url").is_none());
    }

    #[tokio::test]
    async fn test_anonymous_list_returns_all() {
        let app = TestApp::local();
        let cookie = app.sign_up("owner@example.com").await;
        uploaded_key(&app, upload(Some(&cookie), "a.txt", b"a")).await;
        uploaded_key(&app, upload(None, "b.txt", b"b")).await;

        let body = body_json(app.send(get("/api/files")).await).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[rstest]
    #[case("GET")]
    #[case("DELETE")]
    #[tokio::test]
    async fn test_unknown_key_not_found(#[case] method: &str) {
        let app = TestApp::local();
        let request = Request::builder()
            .method(method)
            .uri("/api/files/uploads/never-uploaded.txt")
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "FILE_NOT_FOUND");
        assert_eq!(
            body["error"]["message"],
            "File uploads/never-uploaded.txt not found"
        );
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let app = TestApp::local();
        let key = uploaded_key(&app, upload(None, "gone.txt", b"x")).await;

        let response = app.send(delete(None, &key)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["deleted"], true);
        assert_eq!(body["data"]["key"], key.as_str());

        let response = app.send(delete(None, &key)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_checks_owner() {
        let app = TestApp::local();
        let owner = app.sign_up("u1@example.com").await;
        let intruder = app.sign_up("u2@example.com").await;
        let key = uploaded_key(&app, upload(Some(&owner), "mine.txt", b"x")).await;

        let response = app.send(delete(Some(&intruder), &key)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"]["code"], "FORBIDDEN");

        let response = app.send(delete(Some(&owner), &key)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_anonymous_delete_allowed() {
        let app = TestApp::local();
        let owner = app.sign_up("u3@example.com").await;
        let key = uploaded_key(&app, upload(Some(&owner), "mine.txt", b"x")).await;

        let response = app.send(delete(None, &key)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_same_name_uploads_get_distinct_keys() {
        let app = TestApp::local();
        let first = uploaded_key(&app, upload(None, "dup.txt", b"1")).await;
        let second = uploaded_key(&app, upload(None, "dup.txt", b"2")).await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_missing_blob_reported() {
        let app = TestApp::local();
        let key = uploaded_key(&app, upload(None, "orphan.txt", b"x")).await;
        let backend = app.state.storage.select().unwrap();
        assert!(backend.delete(&key).await.unwrap());

        let response = app.send(get(&format!("/api/files/{key}"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "FILE_NOT_FOUND");
        assert_eq!(
            body["error"]["message"],
            format!("File {key} not found in storage")
        );
        assert_eq!(body["error"]["details"]["reason"], "blob_missing");
    }

    #[tokio::test]
    async fn test_multipart_without_file_part() {
        let app = TestApp::local();
        let request = Request::builder()
            .method("POST")
            .uri("/api/files")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body("attachment", "a.txt", "text/plain", b"x"))
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "MISSING_FILE");
    }

    #[tokio::test]
    async fn test_raw_body_upload() {
        let app = TestApp::local();
        let request = Request::builder()
            .method("POST")
            .uri("/api/files")
            .header(CONTENT_TYPE, "application/json")
            .header(X_FILENAME, "data.json")
            .body(Body::from(r#"{"a":1}"#))
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let data = body_json(response).await["data"].clone();
        assert_eq!(data["filename"], "data.json");
        assert_eq!(data["mimeType"], "application/json");
        assert_eq!(data["size"], 7);
    }

    #[tokio::test]
    async fn test_raw_body_defaults() {
        let app = TestApp::local();
        let request = Request::builder()
            .method("POST")
            .uri("/api/files")
            .body(Body::from("bytes"))
            .unwrap();
        let data = body_json(app.send(request).await).await["data"].clone();
        assert!(data["filename"].as_str().unwrap().starts_with("file-"));
        assert_eq!(data["mimeType"], DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_upload_over_limit_rejected() {
        let app = TestApp::local();
        let request = Request::builder()
            .method("POST")
            .uri("/api/files")
            .header(X_FILENAME, "big.bin")
            .body(Body::from(vec![0u8; 2 * 1024 * 1024]))
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_bucket_backend_round_trip() {
        let app = TestApp::with_bucket();
        let key = uploaded_key(&app, upload(None, "cloud.txt", b"in the bucket")).await;

        let response = app.send(get(&format!("/api/files/{key}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.as_ref(), b"in the bucket");
        // nothing written to the local root
        assert!(std::fs::read_dir(app.root.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_sidecar_like_filename_accepted_by_both_backends() {
        for app in [TestApp::local(), TestApp::with_bucket()] {
            let key = uploaded_key(&app, upload(None, "report.meta.json", b"{}")).await;
            assert!(key.ends_with("-report.meta_json"), "{key}");

            let response = app.send(get(&format!("/api/files/{key}"))).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()[CONTENT_DISPOSITION],
                "inline; filename=\"report.meta.json\""
            );
            assert_eq!(body_bytes(response).await.as_ref(), b"{}");

            let listed = body_json(app.send(get("/api/files")).await).await;
            assert_eq!(listed["data"][0]["filename"], "report.meta.json");
        }
    }

    #[tokio::test]
    async fn test_multipart_media_type_is_case_insensitive() {
        let app = TestApp::local();
        let request = Request::builder()
            .method("POST")
            .uri("/api/files")
            .header(
                CONTENT_TYPE,
                format!("Multipart/Form-Data; boundary={BOUNDARY}"),
            )
            .body(multipart_body("file", "upper.txt", "text/plain", b"hello"))
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let data = body_json(response).await["data"].clone();
        assert_eq!(data["filename"], "upper.txt");
        assert_eq!(data["size"], 5);
    }

    #[rstest]
    #[case("report.pdf", "report.pdf")]
    #[case("my file.txt", "my file.txt")]
    #[case("a\"b.txt", "a_b.txt")]
    #[case("résumé.txt", "r_sum_.txt")]
    fn test_disposition_filename(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(disposition_filename(input), expected);
    }

    #[test]
    fn test_multipart_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_multipart(&headers));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=x"),
        );
        assert!(is_multipart(&headers));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("MULTIPART/FORM-DATA ; boundary=x"),
        );
        assert!(is_multipart(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/mixed"));
        assert!(!is_multipart(&headers));
    }
}

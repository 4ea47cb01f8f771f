use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use parsepro_core::{
    export_csv, BatchError, BatchInput, BatchResult, ErrorKind, EXPORT_FILENAME,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/upload", post(upload))
}

/// Header carrying the caller's LLM credential. Forwarded verbatim to the
/// extraction client; never logged or persisted here.
const CREDENTIAL_HEADER: &str = "x-api-key";

/// Header surfacing per-entry failures alongside the CSV body, so an
/// all-failed batch is distinguishable from an empty one.
const FAILURES_HEADER: &str = "x-entry-failures";

#[derive(Debug, Serialize)]
struct FailureSummary {
    entry: String,
    kind: ErrorKind,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorKind,
    message: String,
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let credential = headers
        .get(CREDENTIAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let upload = match read_file_part(&mut multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    let Some((filename, content_type, bytes)) = upload else {
        return error_response(
            StatusCode::BAD_REQUEST,
            ErrorKind::BatchUnreadable,
            "no file part in request",
        );
    };

    let input = match BatchInput::from_upload(&filename, &content_type, bytes) {
        Ok(input) => input,
        Err(e) => return batch_error_response(&e),
    };

    match state.processor.process(input, &credential).await {
        Ok(result) => csv_response(&result),
        Err(e) => batch_error_response(&e),
    }
}

type FilePart = (String, String, Vec<u8>);

async fn read_file_part(multipart: &mut Multipart) -> Result<Option<FilePart>, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    ErrorKind::BatchUnreadable,
                    &format!("unreadable multipart body: {e}"),
                ))
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        return match field.bytes().await {
            Ok(bytes) => Ok(Some((filename, content_type, bytes.to_vec()))),
            Err(e) => Err(error_response(
                StatusCode::BAD_REQUEST,
                ErrorKind::BatchUnreadable,
                &format!("failed to read upload: {e}"),
            )),
        };
    }
}

fn csv_response(result: &BatchResult) -> Response {
    let body = match export_csv(&result.records) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("export failed: {e}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::UpstreamFailure,
                "failed to serialize export",
            );
        }
    };

    let mut response = (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        body,
    )
        .into_response();

    if !result.failures.is_empty() {
        let failures: Vec<FailureSummary> = result
            .failures
            .iter()
            .map(|f| FailureSummary {
                entry: f.entry_name.clone(),
                kind: f.kind(),
            })
            .collect();

        match serde_json::to_string(&failures)
            .ok()
            .and_then(|json| HeaderValue::from_str(&json).ok())
        {
            Some(value) => {
                response.headers_mut().insert(FAILURES_HEADER, value);
            }
            None => tracing::warn!(
                count = result.failures.len(),
                "entry failures not header-safe; reported in logs only"
            ),
        }
    }

    response
}

fn batch_error_response(error: &BatchError) -> Response {
    let status = match error.kind() {
        ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::AuthFailure => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, error.kind(), &error.to_string())
}

fn error_response(status: StatusCode, kind: ErrorKind, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: kind,
            message: message.to_string(),
        }),
    )
        .into_response()
}

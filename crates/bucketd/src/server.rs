//! Axum HTTP surface over the ingestion pipeline.
//!
//! Three routes: an index banner, multipart upload, and a checksum existence
//! query. Uploads carry the payload in a `file` field; any `X-*` request
//! header becomes a tag (prefix stripped) for replica template resolution.
//! The pipeline is synchronous, so each ingest runs on the blocking pool.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bucket_store::{Error as StoreError, Manifest, Pipeline};
use serde_json::json;
use tracing::{error, info};

/// Multipart framing overhead allowed on top of the payload cap.
const BODY_SLACK: u64 = 1 << 20;

const UPLOAD_FIELD: &str = "file";
const TAG_HEADER_PREFIX: &str = "x-";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let body_limit = pipeline.config().max_content_length.saturating_add(BODY_SLACK);
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/query/{checksum}", get(query))
        .layer(DefaultBodyLimit::max(body_limit as usize))
        .with_state(AppState { pipeline })
}

pub async fn run(bind_addr: &str, pipeline: Pipeline) -> anyhow::Result<()> {
    let app = router(Arc::new(pipeline));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::ContentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            StoreError::InvalidChecksum(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %e, "upload failed");
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

async fn index(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "algorithm": state.pipeline.config().algorithm.as_str(),
    }))
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Manifest>, ApiError> {
    let tags = tags_from_headers(&headers);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(ToString::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        let pipeline = state.pipeline.clone();
        let manifest = tokio::task::spawn_blocking(move || {
            pipeline.ingest(bytes.as_ref(), filename.as_deref(), &tags)
        })
        .await
        .map_err(|e| {
            error!(error = %e, "ingest task panicked");
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "internal error".to_string(),
            }
        })??;

        return Ok(Json(manifest));
    }

    Err(ApiError::bad_request(format!(
        "multipart field '{UPLOAD_FIELD}' is required"
    )))
}

async fn query(
    State(state): State<AppState>,
    Path(checksum): Path<String>,
) -> Response {
    let stored = state.pipeline.exists(&checksum);
    let status = if stored {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Json(json!({ "checksum": checksum, "stored": stored }))).into_response()
}

/// `X-*` request headers become replica tags, prefix stripped. Header names
/// arrive lowercased; template matching is case-insensitive anyway.
fn tags_from_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(TAG_HEADER_PREFIX)?;
            if key.is_empty() {
                return None;
            }
            let value = value.to_str().ok()?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn tag_extraction_strips_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user", HeaderValue::from_static("bob"));
        headers.insert("x-topic", HeaderValue::from_static("demo"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));

        let tags = tags_from_headers(&headers);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["user"], "bob");
        assert_eq!(tags["topic"], "demo");
    }

    #[test]
    fn non_utf8_header_values_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user", HeaderValue::from_bytes(&[0xFF, 0xFE]).unwrap());
        assert!(tags_from_headers(&headers).is_empty());
    }
}

use axum::{
    body::Body,
    extract::{Multipart, Path},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use utoipa::OpenApi;

use crate::utils::api_response::ApiResponse;
use crate::utils::storage;

/// Serving uploaded files needs no session; the keys are unguessable.
pub fn public_media_routes() -> Router<PgPool> {
    Router::new().route("/media/{key}", get(serve_media))
}

pub fn media_routes() -> Router<PgPool> {
    Router::new().route("/media", post(upload_media))
}

fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

async fn serve_media(Path(key): Path<String>) -> Response {
    match storage::get(&key).await {
        Ok(Some(bytes)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type_for(&key))
            .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
            .body(Body::from(bytes))
            .unwrap_or_else(|_| Response::new(Body::empty())),
        Ok(None) => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap_or_else(|_| Response::new(Body::empty())),
        Err(e) => {
            tracing::error!(error = %e, "failed to read media file");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::empty())
                .unwrap_or_else(|_| Response::new(Body::empty()))
        }
    }
}

#[utoipa::path(
    post,
    path = "/media",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored; returns its URL path", body = String),
        (status = 400, description = "No file field in the upload"),
        (status = 500, description = "Failed to store file")
    ),
    tag = "Media",
    security(("bearerAuth" = []))
)]
pub async fn upload_media(
    mut multipart: Multipart,
) -> Result<ApiResponse<String>, ApiResponse<()>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Failed to process multipart data",
            Some(json!({ "message": e.to_string() })),
        )
    })? {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let extension = filename
            .rsplit('.')
            .next()
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin")
            .to_ascii_lowercase();

        let bytes = field.bytes().await.map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::BAD_REQUEST,
                "Failed to read upload data",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

        let url = storage::put(&bytes, &extension).await.map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store file",
                Some(json!({ "message": e.to_string() })),
            )
        })?;

        info!(url = %url, size = bytes.len(), "media uploaded");
        return Ok(ApiResponse::success(StatusCode::CREATED, "File stored", url));
    }

    Err(ApiResponse::<()>::error(
        StatusCode::BAD_REQUEST,
        "No file field in the upload",
        None,
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(upload_media),
    tags(
        (name = "Media", description = "Uploaded image storage")
    )
)]
pub struct MediaDoc;

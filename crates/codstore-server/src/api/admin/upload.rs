//! Image upload to object storage.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;

use crate::api::{ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub key: String,
    pub url: String,
}

/// `POST /api/admin/upload-image` — single-file multipart.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadedImage>>), ApiError> {
    let Some(store) = state.storage.clone() else {
        return Err(ApiError::new(
            req_id.0,
            "internal_error",
            "object storage is not configured",
        ));
    };

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?
        .ok_or_else(|| {
            ApiError::new(req_id.0.clone(), "validation_error", "no file in request")
        })?;

    let file_name = field.file_name().unwrap_or("image").to_owned();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_owned();

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    if bytes.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "uploaded file is empty",
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("file exceeds the {MAX_IMAGE_BYTES}-byte limit"),
        ));
    }

    let stored = store
        .upload_image(bytes.to_vec(), &file_name, &content_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, file_name = %file_name, "image upload failed");
            ApiError::new(req_id.0.clone(), "internal_error", e.to_string())
        })?;

    tracing::info!(key = %stored.key, "image uploaded");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: UploadedImage {
                key: stored.key,
                url: stored.url,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

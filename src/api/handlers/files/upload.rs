use crate::AppState;
use crate::api::error::AppError;
use crate::utils::auth::Identity;
use axum::{
    Extension,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    response::Redirect,
};

use super::types::UploadForm;

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 303, description = "Upload stored, redirect to the listing"),
        (status = 400, description = "Malformed form or invalid file name"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "Upload failed")
    ),
    security(
        ("session" = [])
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    request: Request,
) -> Result<Redirect, AppError> {
    let declared_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    // Progress is measured on the raw body, before multipart parsing sees it.
    let (parts, body) = request.into_parts();
    let body = state.upload_service.instrument_body(body, declared_length);
    let multipart = Multipart::from_request(Request::from_parts(parts, body), &state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    tracing::info!(
        user = %identity.user_id,
        declared_length = ?declared_length,
        "Upload started"
    );
    state.upload_service.ingest(multipart).await?;

    Ok(Redirect::to("/"))
}

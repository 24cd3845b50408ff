use crate::AppState;
use crate::api::error::AppError;
use axum::{Json, extract::State};

use super::types::FileEntryResponse;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Files currently in storage", body = [FileEntryResponse]),
        (status = 500, description = "Storage unavailable")
    ),
    tag = "files"
)]
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<FileEntryResponse>>, AppError> {
    let files = state.file_service.list().await?;

    Ok(Json(
        files
            .into_iter()
            .map(|f| FileEntryResponse::new(f, &state.config.public_path))
            .collect(),
    ))
}

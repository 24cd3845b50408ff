use crate::AppState;
use crate::api::error::AppError;
use crate::utils::auth::Identity;
use axum::{
    Extension, Form,
    extract::{Path, State},
    response::Redirect,
};

use super::types::*;

#[utoipa::path(
    post,
    path = "/delete/{filename}",
    params(
        ("filename" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 303, description = "File deleted, redirect to the listing"),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "File not found")
    ),
    security(
        ("session" = [])
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(filename): Path<String>,
) -> Result<Redirect, AppError> {
    state.file_service.delete(&filename).await?;
    tracing::info!(user = %identity.user_id, "Deleted {}", filename);

    Ok(Redirect::to("/"))
}

#[utoipa::path(
    post,
    path = "/rename/{filename}",
    params(
        ("filename" = String, Path, description = "Stored file name")
    ),
    request_body(content = RenameForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "File renamed, redirect to the listing"),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "File not found"),
        (status = 409, description = "Target name already exists")
    ),
    security(
        ("session" = [])
    ),
    tag = "files"
)]
pub async fn rename_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(filename): Path<String>,
    Form(form): Form<RenameForm>,
) -> Result<Redirect, AppError> {
    let renamed = state
        .file_service
        .rename(&filename, form.new_name.trim())
        .await?;
    tracing::info!(user = %identity.user_id, "Renamed {} -> {}", filename, renamed.name);

    Ok(Redirect::to("/"))
}

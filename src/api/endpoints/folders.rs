use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use super::run_blocking;
use crate::api::error::ApiError;
use crate::api::types::{required_id, ApiContext, FolderListing, ListFolderRequest};

/// `POST /list-folder`
pub async fn list(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ListFolderRequest>, JsonRejection>,
) -> Result<Json<FolderListing>, ApiError> {
    let Json(request) = payload?;
    let folder_id = required_id(request.folder_id, "folder_id")?;

    let entries = run_blocking("list_folder", move || {
        ctx.processor.list_folder(&folder_id)
    })
    .await?;

    Ok(Json(FolderListing { entries }))
}

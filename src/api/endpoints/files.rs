use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use super::run_blocking;
use crate::api::error::ApiError;
use crate::api::types::{required, ApiContext, FindFileRequest, FoundFile};

/// `POST /find-file`: inside `folder_id` when given, otherwise by search.
pub async fn find(
    State(ctx): State<ApiContext>,
    payload: Result<Json<FindFileRequest>, JsonRejection>,
) -> Result<Json<FoundFile>, ApiError> {
    let Json(request) = payload?;
    let filename = required(request.filename, "filename")?;
    let folder_id = request
        .folder_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    let file = run_blocking("find_file", move || {
        ctx.processor.find_file(&filename, folder_id.as_deref())
    })
    .await?;

    Ok(Json(file.into()))
}

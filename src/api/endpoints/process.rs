use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use super::run_blocking;
use crate::api::error::ApiError;
use crate::api::types::{
    required, required_id, ApiContext, ExtractedText, ProcessByNameRequest, ProcessFileRequest,
};

/// `POST /process-file`
pub async fn by_id(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ProcessFileRequest>, JsonRejection>,
) -> Result<Json<ExtractedText>, ApiError> {
    let Json(request) = payload?;
    let file_id = required_id(request.file_id, "file_id")?;

    let extracted_text = run_blocking("process_file", move || {
        ctx.processor.process_file(&file_id)
    })
    .await?;

    Ok(Json(ExtractedText { extracted_text }))
}

/// `POST /process-file-by-name`
pub async fn by_name(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ProcessByNameRequest>, JsonRejection>,
) -> Result<Json<ExtractedText>, ApiError> {
    let Json(request) = payload?;
    let filename = required(request.filename, "filename")?;
    let parent_folder_id = required_id(request.parent_folder_id, "parent_folder_id")?;

    let extracted_text = run_blocking("process_file_by_name", move || {
        ctx.processor.process_by_name(&filename, &parent_folder_id)
    })
    .await?;

    Ok(Json(ExtractedText { extracted_text }))
}

//! File handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::AppState;
use crate::file::{FileService, UploadPipeline, UploadRequest};
use crate::web::dto::{FileDataQuery, FileResponse, ListFilesQuery};
use crate::web::error::ApiError;
use crate::web::middleware::SessionToken;

/// POST /files - Upload a folder, file or image.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    token: SessionToken,
    body: Option<Json<UploadRequest>>,
) -> Result<(StatusCode, Json<FileResponse>), ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let pipeline = UploadPipeline::new(
        state.db.pool(),
        &state.sessions,
        &state.storage,
        &state.queue,
    );
    let record = pipeline.upload(token.as_deref(), &req).await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /files - One page of the caller's files under a parent.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    token: SessionToken,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let records = FileService::new(state.db.pool(), &state.sessions)
        .index(
            token.as_deref(),
            query.parent_id.as_deref(),
            query.page.as_deref(),
        )
        .await?;

    Ok(Json(records.into_iter().map(FileResponse::from).collect()))
}

/// GET /files/:id - One of the caller's files.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    token: SessionToken,
) -> Result<Json<FileResponse>, ApiError> {
    let record = FileService::new(state.db.pool(), &state.sessions)
        .show(&id, token.as_deref())
        .await?;

    Ok(Json(record.into()))
}

/// PUT /files/:id/publish - Make a file public.
pub async fn publish_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    token: SessionToken,
) -> Result<Json<FileResponse>, ApiError> {
    set_published(&state, &id, token, true).await
}

/// PUT /files/:id/unpublish - Make a file private.
pub async fn unpublish_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    token: SessionToken,
) -> Result<Json<FileResponse>, ApiError> {
    set_published(&state, &id, token, false).await
}

async fn set_published(
    state: &AppState,
    id: &str,
    token: SessionToken,
    is_public: bool,
) -> Result<Json<FileResponse>, ApiError> {
    let record = FileService::new(state.db.pool(), &state.sessions)
        .set_published(id, token.as_deref(), is_public)
        .await?;

    Ok(Json(record.into()))
}

/// GET /files/:id/data - Raw content, or a derivative via `?size=`.
pub async fn get_file_data(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    token: SessionToken,
    Query(query): Query<FileDataQuery>,
) -> Result<Response, ApiError> {
    let content = FileService::new(state.db.pool(), &state.sessions)
        .get_content(&id, token.as_deref(), query.size.as_deref())
        .await?;

    Ok(([(header::CONTENT_TYPE, content.content_type)], content.bytes).into_response())
}

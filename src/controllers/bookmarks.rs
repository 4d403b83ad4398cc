use axum::Json;
use axum::extract::{Path, State};

use crate::errors::AppError;
use crate::services::AuthUser;
use crate::types::{
    AddBookmarkRequest, AppState, Bookmark, RemoveBookmarkResponse, ReorderBookmarksRequest,
};

pub(super) async fn list_bookmarks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Bookmark>>, AppError> {
    let bookmarks = state.services.docs.get_bookmarks(&user.id).await?;
    Ok(Json(bookmarks))
}

pub(super) async fn add_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<String>,
    payload: Option<Json<AddBookmarkRequest>>,
) -> Result<Json<Bookmark>, AppError> {
    let notes = payload.and_then(|Json(body)| body.notes);
    let bookmark = state
        .services
        .docs
        .add_bookmark(&user.id, &document_id, notes)
        .await?;
    Ok(Json(bookmark))
}

pub(super) async fn remove_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<String>,
) -> Result<Json<RemoveBookmarkResponse>, AppError> {
    state
        .services
        .docs
        .remove_bookmark(&user.id, &document_id)
        .await?;
    Ok(Json(RemoveBookmarkResponse {
        removed: true,
        document_id,
    }))
}

pub(super) async fn reorder_bookmarks(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ReorderBookmarksRequest>,
) -> Result<Json<Vec<Bookmark>>, AppError> {
    let bookmarks = state
        .services
        .docs
        .update_bookmark_order(&user.id, &payload.bookmark_ids)
        .await?;
    Ok(Json(bookmarks))
}

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::services::{AuthUser, ServiceError};
use crate::types::{AppState, Document, DocumentPatch, NewDocument};

fn not_found_by_id(id: &str) -> AppError {
    AppError::not_found(format!("Document not found with id: {}", id))
}

pub(super) async fn list_docs(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<Document>>, AppError> {
    let docs = state.services.docs.get_all_docs().await?;
    Ok(Json(docs))
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    let categories = state.services.docs.get_categories().await?;
    Ok(Json(categories))
}

pub(super) async fn get_doc_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    match state.services.docs.get_doc_by_id(&id).await {
        Ok(Some(doc)) => Ok(Json(doc)),
        Ok(None) => {
            warn!("document not found: id={}", id);
            Err(not_found_by_id(&id))
        }
        Err(err) => Err(AppError::internal("Error fetching document", err)),
    }
}

/// The pre-read only feeds the logs; the update itself re-checks existence.
pub(super) async fn update_doc_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<DocumentPatch>,
) -> Result<Json<Document>, AppError> {
    info!("document update requested: id={} user={}", id, user.id);
    debug!(
        "document update payload: {}",
        serde_json::to_string(&patch).unwrap_or_default()
    );

    let existing = match state.services.docs.get_doc_by_id(&id).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            warn!("document update target missing: id={}", id);
            return Err(not_found_by_id(&id));
        }
        Err(err) => {
            return Err(AppError::internal(
                format!("Error updating document: {}", err),
                err,
            ));
        }
    };
    debug!(
        "existing document found: id={} path={} updated_at={}",
        existing.id, existing.path, existing.updated_at
    );

    match state.services.docs.update_doc_by_id(&id, patch).await {
        Ok(doc) => {
            info!("document updated via id: id={} path={}", doc.id, doc.path);
            Ok(Json(doc))
        }
        Err(ServiceError::NotFound(_)) => {
            warn!("document vanished during update: id={}", id);
            Err(not_found_by_id(&id))
        }
        Err(err) => Err(AppError::internal(
            format!("Error updating document: {}", err),
            err,
        )),
    }
}

pub(super) async fn get_doc_by_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Document>, AppError> {
    fetch_by_path(&state, &path).await
}

/// `/bookmarks/<x>` matches the bookmark route before the catch-all; GET and
/// PUT there still address the document stored under that path.
pub(super) async fn get_doc_under_bookmarks(
    State(state): State<AppState>,
    Path(rest): Path<String>,
) -> Result<Json<Document>, AppError> {
    fetch_by_path(&state, &format!("bookmarks/{}", rest)).await
}

async fn fetch_by_path(state: &AppState, path: &str) -> Result<Json<Document>, AppError> {
    match state.services.docs.get_doc(&format!("/{}", path)).await {
        Ok(doc) => Ok(Json(doc)),
        Err(ServiceError::NotFound(_)) => {
            warn!("document not found: path=/{}", path);
            Err(AppError::not_found(format!(
                "Document not found for path: {}",
                path
            )))
        }
        Err(err) => Err(AppError::internal("Error fetching document", err)),
    }
}

pub(super) async fn create_doc(
    State(state): State<AppState>,
    user: AuthUser,
    Json(doc): Json<NewDocument>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    info!("document create requested: path={} user={}", doc.path, user.id);
    let created = state.services.docs.create_doc(doc).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn update_doc_by_path(
    State(state): State<AppState>,
    user: AuthUser,
    Path(path): Path<String>,
    Json(patch): Json<DocumentPatch>,
) -> Result<Json<Document>, AppError> {
    apply_by_path(&state, &user, &path, patch).await
}

pub(super) async fn update_doc_under_bookmarks(
    State(state): State<AppState>,
    user: AuthUser,
    Path(rest): Path<String>,
    Json(patch): Json<DocumentPatch>,
) -> Result<Json<Document>, AppError> {
    apply_by_path(&state, &user, &format!("bookmarks/{}", rest), patch).await
}

async fn apply_by_path(
    state: &AppState,
    user: &AuthUser,
    path: &str,
    patch: DocumentPatch,
) -> Result<Json<Document>, AppError> {
    info!("document update requested: path={} user={}", path, user.id);
    let updated = state.services.docs.update_doc(path, patch).await?;
    Ok(Json(updated))
}

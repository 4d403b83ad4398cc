use axum::Json;
use axum::extract::State;

use crate::errors::AppError;
use crate::types::{AppState, HealthResponse};

pub(super) async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.deps.db)
        .await
        .map_err(|err| AppError::internal("database unavailable", err))?;
    Ok(Json(HealthResponse { status: "ok" }))
}

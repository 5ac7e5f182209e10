use axum::{
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;

use super::dto::{Pagination, ProcessCsvRequest, ProcessCsvResponse};
use super::error::ImportError;
use super::export::to_csv;
use super::repo::ImportStore;
use super::repo_types::ImportedUser;
use super::services::{run_import, AdminUser};
use crate::config::ImportConfig;
use crate::state::AppState;

/// Room for JSON escaping of the CSV text on top of the configured limit.
fn body_limit(cfg: &ImportConfig) -> usize {
    cfg.max_bytes.saturating_mul(2).saturating_add(16 * 1024)
}

pub fn import_routes(cfg: &ImportConfig) -> Router<AppState> {
    Router::new()
        .route("/imports", get(list_imports).post(process_csv))
        .route("/imports/export", get(export_imports))
        .layer(DefaultBodyLimit::max(body_limit(cfg)))
}

/// POST /imports { csvContent }
#[instrument(skip(state, body))]
pub async fn process_csv(
    AdminUser(user_id): AdminUser,
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ProcessCsvResponse>, ImportError> {
    let body = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ImportError::TooLarge {
            max_bytes: state.config.import.max_bytes,
        },
        _ => ImportError::InvalidBody(rejection.body_text()),
    })?;
    let req: ProcessCsvRequest =
        serde_json::from_slice(&body).map_err(|e| ImportError::InvalidBody(e.to_string()))?;

    let (users, errors) = run_import(&state, user_id, &req.csv_content).await?;
    Ok(Json(ProcessCsvResponse {
        success: true,
        count: users.len(),
        users,
        errors,
    }))
}

#[instrument(skip(state))]
pub async fn list_imports(
    AdminUser(user_id): AdminUser,
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<ImportedUser>>, ImportError> {
    let (limit, offset) = p.clamped();
    let rows = state
        .imports
        .list(user_id, limit, offset)
        .await
        .map_err(ImportError::Storage)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn export_imports(
    AdminUser(user_id): AdminUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ImportError> {
    let rows = state
        .imports
        .list_all(user_id)
        .await
        .map_err(ImportError::Storage)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"imported_users.csv\"",
            ),
        ],
        to_csv(&rows),
    ))
}

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use time::{Date, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::credentials::{generate_users, GeneratedUser};
use super::error::ImportError;
use super::repo_types::ImportedUser;
use super::validation::{validate_csv, RowError};
use super::repo::ImportStore;
use crate::auth::roles::{Role, RoleDirectory};
use crate::auth::services::AuthUser;
use crate::config::ImportConfig;
use crate::state::AppState;

/// Caller holding a valid access token and the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ImportError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ImportError::Unauthorized(msg))?;

        let is_admin = state
            .roles
            .has_role(user_id, Role::Admin)
            .await
            .map_err(|e| ImportError::Unauthorized(format!("role lookup failed: {e}")))?;
        if !is_admin {
            warn!(%user_id, "admin role required");
            return Err(ImportError::Forbidden);
        }
        Ok(AdminUser(user_id))
    }
}

/// Pure part of the pipeline: validated rows turned into generated users.
#[derive(Debug)]
pub struct PreparedImport {
    pub users: Vec<GeneratedUser>,
    pub errors: Vec<RowError>,
}

pub fn prepare_import(
    csv: &str,
    cfg: &ImportConfig,
    today: Date,
) -> Result<PreparedImport, ImportError> {
    let validated = validate_csv(csv, cfg, today)?;
    let users = generate_users(&validated.rows, &cfg.email_domain, cfg.password_length);
    Ok(PreparedImport {
        users,
        errors: validated.errors,
    })
}

/// Validate, generate and persist one upload.
pub async fn run_import(
    state: &AppState,
    imported_by: Uuid,
    csv: &str,
) -> Result<(Vec<ImportedUser>, Vec<RowError>), ImportError> {
    let today = OffsetDateTime::now_utc().date();
    let prepared = prepare_import(csv, &state.config.import, today)?;

    let saved = state
        .imports
        .insert_batch(imported_by, &prepared.users)
        .await
        .map_err(ImportError::Storage)?;

    info!(
        %imported_by,
        imported = saved.len(),
        skipped = prepared.errors.len(),
        "csv import stored"
    );
    Ok((saved, prepared.errors))
}

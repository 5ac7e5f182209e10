use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, Credentials, PublicUser, RefreshRequest},
        repo::Account,
        roles::{Role, RoleDirectory},
        services::{hash_password, is_valid_email, verify_password, AuthUser, JwtKeys},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn public_user(state: &AppState, user: Account) -> Result<PublicUser, (StatusCode, String)> {
    let roles = state.roles.roles_of(user.id).await.map_err(internal)?;
    Ok(PublicUser {
        id: user.id,
        email: user.email,
        roles,
    })
}

async fn issue_tokens(state: &AppState, user: Account) -> Result<AuthResponse, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id).map_err(internal)?;
    let refresh_token = keys.sign_refresh(user.id).map_err(internal)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(state, user).await?,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = payload.normalized_email();

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.chars().count() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password must be at least 8 characters".into()));
    }

    if Account::find_by_email(&state.db, &email)
        .await
        .map_err(internal)?
        .is_some()
    {
        warn!(%email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(internal)?;
    let user = Account::create(&state.db, &email, &hash)
        .await
        .map_err(internal)?;

    state.roles.grant(user.id, Role::User).await.map_err(internal)?;
    if state.config.is_admin_email(&user.email) {
        state.roles.grant(user.id, Role::Admin).await.map_err(internal)?;
        info!(user_id = %user.id, "admin role granted at registration");
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(issue_tokens(&state, user).await?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = payload.normalized_email();

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let Some(user) = Account::find_by_email(&state.db, &email).await.map_err(internal)? else {
        warn!(%email, "login for unknown email");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash).map_err(internal)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user).await?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    let user = Account::find_by_id(&state.db, claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(issue_tokens(&state, user).await?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = Account::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            error!(user_id = %user_id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;

    Ok(Json(public_user(&state, user).await?))
}

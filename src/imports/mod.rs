pub mod credentials;
mod dto;
pub mod error;
mod export;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod tokenizer;
pub mod validation;

use crate::config::ImportConfig;
use crate::state::AppState;
use axum::Router;

pub fn router(cfg: &ImportConfig) -> Router<AppState> {
    handlers::import_routes(cfg)
}

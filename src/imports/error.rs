use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use super::tokenizer::TokenizeError;
use super::validation::RowError;

/// How many row errors are echoed inside a `NoValidRows` message.
const ROW_ERRORS_IN_MESSAGE: usize = 5;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: admin role required")]
    Forbidden,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("CSV exceeds maximum size of {max_bytes} bytes")]
    TooLarge { max_bytes: usize },

    #[error("CSV has {rows} data rows, maximum is {max_rows}")]
    TooManyRows { rows: usize, max_rows: usize },

    #[error("CSV must contain a header row and at least one data row")]
    MissingData,

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error(transparent)]
    Malformed(#[from] TokenizeError),

    #[error("No valid rows found: {}", summarize(.0))]
    NoValidRows(Vec<RowError>),

    #[error("Failed to save imported users: {0}")]
    Storage(#[source] anyhow::Error),
}

fn summarize(errors: &[RowError]) -> String {
    let mut parts: Vec<String> = errors
        .iter()
        .take(ROW_ERRORS_IN_MESSAGE)
        .map(ToString::to_string)
        .collect();
    if errors.len() > ROW_ERRORS_IN_MESSAGE {
        parts.push(format!("and {} more", errors.len() - ROW_ERRORS_IN_MESSAGE));
    }
    parts.join("; ")
}

impl ImportError {
    pub fn status(&self) -> StatusCode {
        match self {
            ImportError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ImportError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ImportError::Storage(e) = &self {
            tracing::error!(error = ?e, "import storage failure");
        } else {
            tracing::warn!(%status, error = %self, "import rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_message_lists_fields() {
        let err = ImportError::MissingColumns(vec!["postal_code", "birthday"]);
        assert_eq!(err.to_string(), "Missing required columns: postal_code, birthday");
    }

    #[test]
    fn only_forbidden_maps_to_403() {
        assert_eq!(ImportError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ImportError::MissingData.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ImportError::Unauthorized("missing token".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn no_valid_rows_truncates_error_list() {
        let errors: Vec<RowError> = (2..10)
            .map(|line| RowError {
                line,
                message: "bad".into(),
            })
            .collect();
        let msg = ImportError::NoValidRows(errors).to_string();
        assert!(msg.starts_with("No valid rows found: Line 2: bad"));
        assert!(msg.ends_with("and 3 more"));
    }
}

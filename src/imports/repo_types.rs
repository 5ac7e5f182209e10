use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Generated user as stored in `imported_users`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportedUser {
    pub id: Uuid,
    pub full_name: String,
    pub postal_code: String,
    pub birthday: String,
    pub generated_email: String,
    pub generated_password: String,
    pub imported_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

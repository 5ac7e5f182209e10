use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, created_at";

/// Row of the `users` table: someone who can sign in to the service.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

impl Account {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?)
    }

    /// Insert a new account. `password_hash` must already be an argon2 PHC string.
    pub async fn create(db: &PgPool, email: &str, password_hash: &str) -> anyhow::Result<Account> {
        let sql = format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {ACCOUNT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .bind(password_hash)
            .fetch_one(db)
            .await?)
    }
}

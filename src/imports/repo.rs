use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::credentials::GeneratedUser;
use super::repo_types::ImportedUser;

/// Persistence of imported users. `viewer`/`imported_by` is the acting admin.
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Insert all users atomically, returning them in input order.
    async fn insert_batch(
        &self,
        imported_by: Uuid,
        users: &[GeneratedUser],
    ) -> anyhow::Result<Vec<ImportedUser>>;

    /// Newest first.
    async fn list(&self, viewer: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<ImportedUser>>;

    async fn list_all(&self, viewer: Uuid) -> anyhow::Result<Vec<ImportedUser>>;
}

#[derive(Clone)]
pub struct PgImportStore {
    db: PgPool,
}

impl PgImportStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a transaction whose row-level security policies see `user_id`.
    async fn begin_as(&self, user_id: Uuid) -> anyhow::Result<Transaction<'static, Postgres>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query("SELECT set_config('app.user_id', $1, true)")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await
            .context("set app.user_id")?;
        Ok(tx)
    }
}

const RETURNING: &str = r#"
    id, full_name, postal_code, to_char(birthday, 'YYYY-MM-DD') AS birthday,
    generated_email, generated_password, imported_by, created_at
"#;

async fn insert_user_tx(
    tx: &mut Transaction<'_, Postgres>,
    imported_by: Uuid,
    user: &GeneratedUser,
) -> anyhow::Result<ImportedUser> {
    let sql = format!(
        r#"
        INSERT INTO imported_users
            (full_name, postal_code, birthday, generated_email, generated_password, imported_by)
        VALUES ($1, $2, $3::date, $4, $5, $6)
        RETURNING {RETURNING}
        "#
    );
    let row = sqlx::query_as::<_, ImportedUser>(&sql)
        .bind(&user.full_name)
        .bind(&user.postal_code)
        .bind(&user.birthday)
        .bind(&user.generated_email)
        .bind(&user.generated_password)
        .bind(imported_by)
        .fetch_one(&mut **tx)
        .await
        .with_context(|| format!("insert imported user {}", user.generated_email))?;
    Ok(row)
}

#[async_trait]
impl ImportStore for PgImportStore {
    async fn insert_batch(
        &self,
        imported_by: Uuid,
        users: &[GeneratedUser],
    ) -> anyhow::Result<Vec<ImportedUser>> {
        anyhow::ensure!(!users.is_empty(), "no users to insert");

        let mut tx = self.begin_as(imported_by).await?;
        let mut out = Vec::with_capacity(users.len());
        for user in users {
            out.push(insert_user_tx(&mut tx, imported_by, user).await?);
        }
        tx.commit().await.context("commit tx")?;
        Ok(out)
    }

    async fn list(&self, viewer: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<ImportedUser>> {
        let sql = format!(
            r#"
            SELECT {RETURNING}
              FROM imported_users
             ORDER BY created_at DESC, id
             LIMIT $1 OFFSET $2
            "#
        );
        let mut tx = self.begin_as(viewer).await?;
        let rows = sqlx::query_as::<_, ImportedUser>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await
            .context("list imported users")?;
        tx.commit().await.context("commit tx")?;
        Ok(rows)
    }

    async fn list_all(&self, viewer: Uuid) -> anyhow::Result<Vec<ImportedUser>> {
        let sql = format!(
            r#"
            SELECT {RETURNING}
              FROM imported_users
             ORDER BY created_at DESC, id
            "#
        );
        let mut tx = self.begin_as(viewer).await?;
        let rows = sqlx::query_as::<_, ImportedUser>(&sql)
            .fetch_all(&mut *tx)
            .await
            .context("list all imported users")?;
        tx.commit().await.context("commit tx")?;
        Ok(rows)
    }
}

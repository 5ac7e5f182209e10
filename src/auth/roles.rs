use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role attached to an account through `user_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "app_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// Lookup and assignment of account roles.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn roles_of(&self, user_id: Uuid) -> anyhow::Result<Vec<Role>>;
    async fn grant(&self, user_id: Uuid, role: Role) -> anyhow::Result<()>;

    async fn has_role(&self, user_id: Uuid, role: Role) -> anyhow::Result<bool> {
        Ok(self.roles_of(user_id).await?.contains(&role))
    }
}

#[derive(Clone)]
pub struct PgRoleDirectory {
    db: PgPool,
}

impl PgRoleDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleDirectory for PgRoleDirectory {
    async fn roles_of(&self, user_id: Uuid) -> anyhow::Result<Vec<Role>> {
        let roles = sqlx::query_scalar::<_, Role>(
            r#"
            SELECT role
              FROM user_roles
             WHERE user_id = $1
             ORDER BY role
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list roles")?;
        Ok(roles)
    }

    async fn grant(&self, user_id: Uuid, role: Role) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.db)
        .await
        .context("grant role")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fakes::FakeRoles;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }

    #[tokio::test]
    async fn has_role_follows_grants() {
        let roles = FakeRoles::default();
        let id = Uuid::new_v4();
        assert!(!roles.has_role(id, Role::Admin).await.unwrap());
        roles.grant(id, Role::Admin).await.unwrap();
        roles.grant(id, Role::Admin).await.unwrap();
        assert!(roles.has_role(id, Role::Admin).await.unwrap());
        assert_eq!(roles.roles_of(id).await.unwrap(), vec![Role::Admin]);
    }
}

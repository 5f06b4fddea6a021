use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{Subject, User, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_subject(&self, subject: &Subject) -> anyhow::Result<Option<User>>;
    /// Inserts the user, or returns the row already stored for its subject.
    async fn save(&self, user: &User) -> anyhow::Result<User>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: Uuid,
    auth0_sub: String,
    created_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: UserId(r.user_id),
            subject: Subject::from_trusted(r.auth0_sub),
            created_at: r.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_subject(&self, subject: &Subject) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, auth0_sub, created_at
            FROM users
            WHERE auth0_sub = $1
            "#,
        )
        .bind(subject.as_str())
        .fetch_optional(&self.db)
        .await
        .context("find user by subject")?;
        Ok(row.map(User::from))
    }

    async fn save(&self, user: &User) -> anyhow::Result<User> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (user_id, auth0_sub, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (auth0_sub) DO UPDATE SET auth0_sub = EXCLUDED.auth0_sub
            RETURNING user_id, auth0_sub, created_at
            "#,
        )
        .bind(user.id.value())
        .bind(user.subject.as_str())
        .bind(user.created_at)
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(row.into())
    }
}

/// PostgreSQL user store
///
/// Schema lives in `migrations/`. The refresh token rotation relies on the
/// conditional `UPDATE ... WHERE refresh_token_hash = $n` being a single
/// statement, so two concurrent rotations of the same token cannot both match.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{hash_refresh_token, NewUser, TokenPrecondition, UserIdentity, UserStore};
use crate::error::AppError;

const USER_COLUMNS: &str = "id, username, email, fullname, avatar, cover_image, \
     password_hash, refresh_token_hash, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    fullname: String,
    avatar: String,
    cover_image: Option<String>,
    password_hash: String,
    refresh_token_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserIdentity {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            fullname: row.fullname,
            avatar: row.avatar,
            cover_image: row.cover_image,
            password_hash: row.password_hash,
            refresh_token_hash: row.refresh_token_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<UserIdentity, AppError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, username, email, fullname, avatar, cover_image,
                               password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.fullname)
        .bind(&new_user.avatar)
        .bind(&new_user.cover_image)
        .bind(&new_user.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        let needle = username_or_email.trim().to_lowercase();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $1 LIMIT 1",
            USER_COLUMNS
        ))
        .bind(needle)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_refresh_token(
        &self,
        id: Uuid,
        new_token: Option<&str>,
        precondition: TokenPrecondition<'_>,
    ) -> Result<bool, AppError> {
        let new_hash = new_token.map(hash_refresh_token);

        let result = match precondition {
            TokenPrecondition::Any => {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET refresh_token_hash = $1, updated_at = $2
                    WHERE id = $3
                    "#,
                )
                .bind(new_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?
            }
            TokenPrecondition::Equals(expected) => {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET refresh_token_hash = $1, updated_at = $2
                    WHERE id = $3 AND refresh_token_hash = $4
                    "#,
                )
                .bind(new_hash)
                .bind(Utc::now())
                .bind(id)
                .bind(hash_refresh_token(expected))
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() == 1)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_account_details(
        &self,
        id: Uuid,
        fullname: &str,
        email: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET fullname = $1, email = $2, updated_at = $3
            WHERE id = $4
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(fullname)
        .bind(email)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_avatar(&self, id: Uuid, url: &str) -> Result<Option<UserIdentity>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET avatar = $1, updated_at = $2 WHERE id = $3 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(url)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_cover_image(
        &self,
        id: Uuid,
        url: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET cover_image = $1, updated_at = $2 WHERE id = $3 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(url)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

const USER_COLUMNS: &str = "u.id, u.account_id, u.email, u.first_name, u.last_name, \
                            u.is_admin, u.is_account_owner, u.created_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub account_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_account_owner: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateUser {
    pub account_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_account_owner: bool,
}

impl User {
    /// Full name when known, the e-mail address otherwise.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }

    pub async fn create(pool: &SqlitePool, data: &CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, account_id, email, first_name, last_name, is_admin, is_account_owner, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING id, account_id, email, first_name, last_name, is_admin, is_account_owner, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(data.account_id)
        .bind(data.email.to_lowercase())
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.is_admin)
        .bind(data.is_account_owner)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_in_account<'e, E>(
        executor: E,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1 AND u.account_id = $2"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_email_in_account<'e, E>(
        executor: E,
        account_id: Uuid,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.email = $1 AND u.account_id = $2"
        ))
        .bind(email.trim().to_lowercase())
        .bind(account_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u \
             JOIN user_tokens t ON t.user_id = u.id \
             WHERE t.token = $1"
        ))
        .bind(token)
        .fetch_optional(pool)
        .await
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl UserToken {
    /// Issues a new opaque bearer token for the user.
    pub async fn create(pool: &SqlitePool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        let token = Uuid::new_v4().simple().to_string();
        sqlx::query_as::<_, UserToken>(
            r#"INSERT INTO user_tokens (token, user_id, created_at)
               VALUES ($1, $2, $3)
               RETURNING token, user_id, created_at"#,
        )
        .bind(token)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, token: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            email: "john@example.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            is_admin: false,
            is_account_owner: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(user("John", "Cena").display_name(), "John Cena");
        assert_eq!(user("John", "").display_name(), "John");
        assert_eq!(user("", " ").display_name(), "john@example.com");
    }
}

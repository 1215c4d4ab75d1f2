//! Database models

use crate::utils::parse_datetime_or_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// User model
///
/// The credential hash never leaves the process: it is skipped on
/// serialization so a `User` can be returned in API responses as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user (for insertion)
///
/// `email` is expected to be normalized by the caller; the store compares it
/// byte-for-byte against the UNIQUE index.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// Blog post model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    #[serde(rename = "desc")]
    pub description: String,
    pub image: String,
    pub user_id: i64,
    /// Author, populated by queries that join the users table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New post (for insertion)
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub image: String,
    pub user_id: i64,
}

/// Post update (for partial updates)
#[derive(Debug, Clone, Default)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl UpdatePost {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            password_hash: row.try_get("password_hash")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&SqliteRow> for Post {
    type Error = sqlx::Error;

    /// Build a post from a row of the posts/users join
    ///
    /// Author columns are prefixed with `author_`; the credential column is
    /// never selected, so the embedded user carries an empty hash.
    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        let author = User {
            id: row.try_get("author_id")?,
            first_name: row.try_get("author_first_name")?,
            last_name: row.try_get("author_last_name")?,
            email: row.try_get("author_email")?,
            phone: row.try_get("author_phone")?,
            password_hash: String::new(),
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("author_created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("author_updated_at")?),
        };

        Ok(Post {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            image: row.try_get("image")?,
            user_id: row.try_get("user_id")?,
            user: Some(author),
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

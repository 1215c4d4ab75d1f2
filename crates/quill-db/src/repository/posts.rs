//! Post operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewPost, Post, UpdatePost};
use crate::repository::Database;

/// Post columns joined with their author, as expected by `Post::try_from`
const POST_WITH_AUTHOR: &str = r#"
    SELECT p.id, p.title, p.description, p.image, p.user_id, p.created_at, p.updated_at,
           u.id AS author_id, u.first_name AS author_first_name, u.last_name AS author_last_name,
           u.email AS author_email, u.phone AS author_phone,
           u.created_at AS author_created_at, u.updated_at AS author_updated_at
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

impl Database {
    // ==================== Post Operations ====================

    /// Insert a new post and return it with its author
    pub async fn insert_post(&self, post: NewPost) -> Result<Post, DbError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, description, image, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.image)
        .bind(post.user_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = result.get("id");

        self.get_post(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Post: {}", id)))
    }

    /// Get a post by ID
    pub async fn get_post(&self, id: i64) -> Result<Option<Post>, DbError> {
        let query = format!("{} WHERE p.id = ?", POST_WITH_AUTHOR);
        let result = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Post::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List all posts, newest first
    pub async fn list_posts(&self) -> Result<Vec<Post>, DbError> {
        let query = format!("{} ORDER BY p.id DESC", POST_WITH_AUTHOR);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| Post::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// List posts written by a user, newest first
    pub async fn list_posts_by_user(&self, user_id: i64) -> Result<Vec<Post>, DbError> {
        let query = format!("{} WHERE p.user_id = ? ORDER BY p.id DESC", POST_WITH_AUTHOR);
        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Post::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Apply a partial update; returns false if the post does not exist
    pub async fn update_post(&self, id: i64, update: UpdatePost) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                image = COALESCE(?, image),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.title)
        .bind(update.description)
        .bind(update.image)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a post
    pub async fn delete_post(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    async fn db_with_author() -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .insert_user(NewUser {
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                email: "grace@example.com".to_string(),
                phone: "555-0101".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (db, user.id)
    }

    fn new_post(user_id: i64, title: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            description: "body".to_string(),
            image: "https://example.com/a.png".to_string(),
            user_id,
        }
    }

    #[tokio::test]
    async fn test_insert_post_embeds_author() {
        let (db, user_id) = db_with_author().await;

        let post = db.insert_post(new_post(user_id, "First")).await.unwrap();
        assert_eq!(post.user_id, user_id);
        let author = post.user.unwrap();
        assert_eq!(author.email, "grace@example.com");
        assert!(author.password_hash.is_empty());
    }

    #[tokio::test]
    async fn test_list_posts_newest_first() {
        let (db, user_id) = db_with_author().await;

        db.insert_post(new_post(user_id, "First")).await.unwrap();
        db.insert_post(new_post(user_id, "Second")).await.unwrap();

        let posts = db.list_posts().await.unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "First"]);

        assert_eq!(db.list_posts_by_user(user_id).await.unwrap().len(), 2);
        assert!(db.list_posts_by_user(user_id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_post_is_partial() {
        let (db, user_id) = db_with_author().await;
        let post = db.insert_post(new_post(user_id, "Draft")).await.unwrap();

        let updated = db
            .update_post(
                post.id,
                UpdatePost {
                    title: Some("Final".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated);

        let post = db.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.title, "Final");
        assert_eq!(post.description, "body");

        assert!(!db.update_post(9999, UpdatePost::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_post() {
        let (db, user_id) = db_with_author().await;
        let post = db.insert_post(new_post(user_id, "Gone")).await.unwrap();

        assert!(db.delete_post(post.id).await.unwrap());
        assert!(!db.delete_post(post.id).await.unwrap());
        assert!(db.get_post(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_post_requires_existing_author() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.insert_post(new_post(42, "Orphan")).await.is_err());
    }
}

//! User store seam consumed by the registration and login flow

use async_trait::async_trait;
use quill_db::{Database, DbError, NewUser, User};

/// User records keyed by normalized email
///
/// Implementations must reject a second record with the same email
/// atomically (`DbError::Duplicate`), independent of any prior lookup.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    async fn create(&self, user: NewUser) -> Result<User, DbError>;
}

#[async_trait]
impl UserStore for Database {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        self.get_user_by_email(email).await
    }

    async fn create(&self, user: NewUser) -> Result<User, DbError> {
        self.insert_user(user).await
    }
}

//! Registration and login orchestration

use quill_db::{DbError, NewUser, User};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::email::{EmailPolicy, is_valid_email};
use crate::error::AuthError;
use crate::jwt::{IssuedToken, JwtManager};
use crate::password::CredentialHasher;
use crate::store::UserStore;
use crate::throttle::LoginThrottle;

/// Account rules applied at registration and login
#[derive(Debug, Clone)]
pub struct AccountPolicy {
    /// Minimum password length in characters
    pub min_password_length: usize,
    pub email: EmailPolicy,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            min_password_length: 7,
            email: EmailPolicy::default(),
        }
    }
}

/// Registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: IssuedToken,
}

/// Creates accounts and authenticates sign-ins
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    jwt: Arc<JwtManager>,
    throttle: Arc<LoginThrottle>,
    policy: AccountPolicy,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        jwt: Arc<JwtManager>,
        throttle: Arc<LoginThrottle>,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            store,
            hasher,
            jwt,
            throttle,
            policy,
        }
    }

    /// Register a new account
    ///
    /// Returns the created user; its credential hash is never serialized.
    pub async fn register(&self, input: Registration) -> Result<User, AuthError> {
        let email = self.policy.email.normalize(&input.email);

        if input.password.chars().count() < self.policy.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters long",
                self.policy.min_password_length
            )));
        }

        if !is_valid_email(&email) {
            return Err(AuthError::Validation("Invalid email format".to_string()));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            debug!("Registration rejected, email taken: {}", email);
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hasher.hash_blocking(input.password).await?;

        let user = self
            .store
            .create(NewUser {
                first_name: input.first_name,
                last_name: input.last_name,
                email,
                phone: input.phone,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                DbError::Duplicate(_) => AuthError::EmailTaken,
                other => AuthError::Database(other),
            })?;

        info!("Registered user {} ({})", user.id, user.email);
        Ok(user)
    }

    /// Authenticate a sign-in and issue a session token
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = self.policy.email.normalize(email);

        let attempt = self.throttle.begin(&email).map_err(|remaining| {
            warn!("Login attempt for throttled identity: {}", email);
            AuthError::TooManyAttempts {
                retry_after_secs: remaining.as_secs_f64().ceil().max(1.0) as u64,
            }
        })?;

        let Some(user) = self.store.find_by_email(&email).await? else {
            debug!("Login for unknown email: {}", email);
            attempt.failed();
            return Err(AuthError::UserNotFound);
        };

        let valid = self
            .hasher
            .verify_blocking(password.to_string(), user.password_hash.clone())
            .await?;

        if !valid {
            debug!("Incorrect password for user {}", user.id);
            attempt.failed();
            return Err(AuthError::IncorrectPassword);
        }

        attempt.succeeded();
        let token = self.jwt.generate_token(user.id)?;

        info!("User {} logged in", user.id);
        Ok(Session { user, token })
    }
}

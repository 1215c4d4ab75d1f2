//! Session token issue and verification

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// Shortest accepted signing secret, in bytes
pub const MIN_SECRET_BYTES: usize = 32;

/// Session token claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// A freshly issued token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens with a single process-wide secret
///
/// Built once at startup and shared read-only; tokens are HS256 only.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl JwtManager {
    /// Create a new manager
    ///
    /// Fails if the secret is shorter than `MIN_SECRET_BYTES` or the
    /// lifetime is not a positive number of hours.
    pub fn new(secret: &str, token_ttl_hours: i64) -> Result<Self, AuthError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::Validation(format!(
                "JWT secret must be at least {} bytes",
                MIN_SECRET_BYTES
            )));
        }

        let token_ttl = Duration::try_hours(token_ttl_hours)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| {
                AuthError::Validation(format!("Invalid token lifetime: {} hours", token_ttl_hours))
            })?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
        })
    }

    /// Issue a token for a user
    pub fn generate_token(&self, user_id: i64) -> Result<IssuedToken, AuthError> {
        self.generate_token_at(user_id, Utc::now())
    }

    /// Issue a token as if it were minted at `issued_at`
    pub fn generate_token_at(
        &self,
        user_id: i64,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = issued_at
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| AuthError::TokenIssue("token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
        };

        debug!("Generating token for user: {}", user_id);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken(e.to_string()),
            })?;

        // Check expiration: valid while now <= exp
        let now = Utc::now().timestamp();
        if token_data.claims.exp < now {
            return Err(AuthError::TokenExpired);
        }

        Ok(token_data.claims)
    }

    /// Validate a token and return the user ID it was issued to
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        let claims = self.validate_token(token)?;
        match claims.sub.parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(AuthError::InvalidSubject(claims.sub)),
        }
    }
}

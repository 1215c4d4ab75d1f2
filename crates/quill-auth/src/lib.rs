//! Quill Authentication and Authorization
//!
//! This crate provides Argon2 credential hashing, stateless JWT sessions
//! carried in an HTTP-only cookie, the session middleware guarding
//! protected routes, and the registration/login flow built on them.

pub mod cookie;
pub mod email;
pub mod error;
pub mod flow;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod store;
pub mod throttle;

pub use cookie::CookieSettings;
pub use email::EmailPolicy;
pub use error::AuthError;
pub use flow::{AccountPolicy, AuthService, Registration, Session};
pub use jwt::{Claims, IssuedToken, JwtManager};
pub use middleware::{AuthUser, SessionGate, session_middleware};
pub use password::{CredentialHasher, HashingParams};
pub use store::UserStore;
pub use throttle::{LoginAttempt, LoginThrottle, ThrottlePolicy};

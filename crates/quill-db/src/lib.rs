//! Quill Database Layer
//!
//! This crate provides the persistence layer for the Quill blogging
//! backend, using SQLite via sqlx for users and posts.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::{Database, DatabaseOptions};

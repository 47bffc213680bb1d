//! Scribe - social blogging API
//!
//! Users, posts, comments, categories and mail over a JSON REST interface
//! backed by MongoDB. The interesting parts are the like/dislike toggle,
//! the follow graph kept on both user records, and single-use hashed
//! tokens for account verification and password reset.

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, ScribeError};

//! Shared types for Scribe

mod error;
mod id;

pub use error::{Result, ScribeError};
pub use id::parse_object_id;

//! Database schemas for Scribe
//!
//! Defines MongoDB document structures for users, posts, comments,
//! categories and sent emails.

mod category;
mod comment;
mod email;
mod metadata;
mod post;
mod user;

pub use category::{CategoryDoc, CATEGORY_COLLECTION};
pub use comment::{CommentDoc, COMMENT_COLLECTION};
pub use email::{EmailDoc, EMAIL_COLLECTION};
pub use metadata::Metadata;
pub use post::{PostDoc, DEFAULT_CATEGORY, POST_COLLECTION};
pub use user::{UserDoc, UserRole, DEFAULT_PROFILE_PIC, USER_COLLECTION};

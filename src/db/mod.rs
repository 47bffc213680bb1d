//! Database layer for Scribe
//!
//! MongoDB storage for users, posts, comments, categories and sent mail,
//! plus the `EntityStore` seam the relationship engine and token workflow
//! are written against.

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{CategoryDoc, CommentDoc, EmailDoc, Metadata, PostDoc, UserDoc};
pub use store::{EntityStore, MongoStore, TokenEffect, TokenPurpose};

//! User document schema
//!
//! Stores credentials, profile fields, the follow graph edges owned by this
//! user, and the two hashed token slots (account verification and password
//! reset).

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::PermissionLevel;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Profile picture assigned at registration
pub const DEFAULT_PROFILE_PIC: &str =
    "https://cdn.pixabay.com/photo/2015/10/05/22/37/blank-profile-picture-973460_1280.png";

/// Role a user chose for themselves
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Guest,
    Blogger,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub first_name: String,
    pub last_name: String,

    #[serde(default = "default_profile_pic")]
    pub profile_pic: String,

    /// Login identifier, unique across users
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Argon2 password hash
    pub password_hash: String,

    #[serde(default)]
    pub post_count: i64,

    #[serde(default)]
    pub is_blocked: bool,

    #[serde(default)]
    pub is_admin: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,

    #[serde(default)]
    pub is_account_verified: bool,

    /// SHA-256 hex digest of the outstanding verification token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_verification_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_verification_token_expires: Option<DateTime>,

    #[serde(default)]
    pub viewed_by: Vec<ObjectId>,

    /// Users following this user
    #[serde(default)]
    pub followers: Vec<ObjectId>,

    /// Users this user follows
    #[serde(default)]
    pub following: Vec<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime>,

    /// SHA-256 hex digest of the outstanding password reset token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_expires: Option<DateTime>,
}

fn default_profile_pic() -> String {
    DEFAULT_PROFILE_PIC.to_string()
}

impl UserDoc {
    /// Create a new user document
    pub fn new(first_name: String, last_name: String, email: String, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            first_name,
            last_name,
            profile_pic: default_profile_pic(),
            email,
            password_hash,
            ..Default::default()
        }
    }

    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Users with at least one follower are promoted
    pub fn account_type(&self) -> &'static str {
        if self.followers.is_empty() {
            "Starter Account"
        } else {
            "Pro Account"
        }
    }

    pub fn permission_level(&self) -> PermissionLevel {
        if self.is_admin {
            PermissionLevel::Admin
        } else {
            PermissionLevel::Authenticated
        }
    }

    pub fn is_followed_by(&self, user_id: &ObjectId) -> bool {
        self.followers.contains(user_id)
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Token digests are looked up on redemption
            (
                doc! { "account_verification_token": 1 },
                Some(
                    IndexOptions::builder()
                        .sparse(true)
                        .name("verification_token_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "password_reset_token": 1 },
                Some(
                    IndexOptions::builder()
                        .sparse(true)
                        .name("reset_token_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

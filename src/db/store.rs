//! Entity store used by the relationship engine and token workflow
//!
//! Each method maps to exactly one single-document atomic operation
//! (`$addToSet`, `$pull`, conditional `findOneAndUpdate`). Nothing here
//! spans two documents; callers that touch two records issue two calls.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{PostDoc, UserDoc, POST_COLLECTION, USER_COLLECTION};
use crate::types::Result;

/// Direction of a set mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Add,
    Remove,
}

/// A document field holding a set of user ids
pub trait SetField: Copy + Send + Sync {
    fn field_name(&self) -> &'static str;
}

/// Reaction sets on a post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSet {
    Likes,
    Dislikes,
}

impl SetField for PostSet {
    fn field_name(&self) -> &'static str {
        match self {
            PostSet::Likes => "likes",
            PostSet::Dislikes => "dislikes",
        }
    }
}

/// Follow graph edges on a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSet {
    Followers,
    Following,
}

impl SetField for UserSet {
    fn field_name(&self) -> &'static str {
        match self {
            UserSet::Followers => "followers",
            UserSet::Following => "following",
        }
    }
}

/// Add or remove one member of one set field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetUpdate<F> {
    pub field: F,
    pub op: SetOp,
    pub member: ObjectId,
}

impl<F: SetField> SetUpdate<F> {
    pub fn add(field: F, member: ObjectId) -> Self {
        Self {
            field,
            op: SetOp::Add,
            member,
        }
    }

    pub fn remove(field: F, member: ObjectId) -> Self {
        Self {
            field,
            op: SetOp::Remove,
            member,
        }
    }

    /// The MongoDB update document for this mutation
    pub fn to_document(&self) -> Document {
        let name = self.field.field_name();
        match self.op {
            SetOp::Add => doc! { "$addToSet": { name: self.member } },
            SetOp::Remove => doc! { "$pull": { name: self.member } },
        }
    }

    /// Apply the mutation to an in-memory set
    pub fn apply_to(&self, set: &mut Vec<ObjectId>) {
        match self.op {
            SetOp::Add => {
                if !set.contains(&self.member) {
                    set.push(self.member);
                }
            }
            SetOp::Remove => set.retain(|m| m != &self.member),
        }
    }
}

/// Which token slot on the user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    Verify,
    Reset,
}

impl TokenPurpose {
    pub fn digest_field(&self) -> &'static str {
        match self {
            TokenPurpose::Verify => "account_verification_token",
            TokenPurpose::Reset => "password_reset_token",
        }
    }

    pub fn expiry_field(&self) -> &'static str {
        match self {
            TokenPurpose::Verify => "account_verification_token_expires",
            TokenPurpose::Reset => "password_reset_expires",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Verify => "verify",
            TokenPurpose::Reset => "reset",
        }
    }
}

/// Hashed token persisted on a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

/// What a successful redemption does to the user, besides clearing the slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEffect {
    MarkVerified,
    ReplaceCredential { password_hash: String },
}

impl TokenEffect {
    pub fn purpose(&self) -> TokenPurpose {
        match self {
            TokenEffect::MarkVerified => TokenPurpose::Verify,
            TokenEffect::ReplaceCredential { .. } => TokenPurpose::Reset,
        }
    }
}

/// Persistence operations needed by the relationship engine and token workflow
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>>;

    async fn find_post(&self, id: &ObjectId) -> Result<Option<PostDoc>>;

    /// Atomically add/remove one id in a post's reaction set.
    /// Returns the post after the update, `None` if it does not exist.
    async fn update_post_set(
        &self,
        id: &ObjectId,
        update: SetUpdate<PostSet>,
    ) -> Result<Option<PostDoc>>;

    /// Atomically add/remove one id in a user's follow set.
    async fn update_user_set(
        &self,
        id: &ObjectId,
        update: SetUpdate<UserSet>,
    ) -> Result<Option<UserDoc>>;

    /// Overwrite the token slot for `purpose` on a user
    async fn store_token(
        &self,
        id: &ObjectId,
        purpose: TokenPurpose,
        token: &StoredToken,
    ) -> Result<Option<UserDoc>>;

    /// Find the user whose slot holds `digest` with an expiry after `now`,
    /// apply `effect` and clear the slot, all in one conditional update.
    async fn redeem_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        effect: &TokenEffect,
    ) -> Result<Option<UserDoc>>;
}

/// MongoDB-backed entity store
#[derive(Clone)]
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    posts: MongoCollection<PostDoc>,
}

impl MongoStore {
    pub async fn open(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: mongo.collection::<UserDoc>(USER_COLLECTION).await?,
            posts: mongo.collection::<PostDoc>(POST_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl EntityStore for MongoStore {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        self.users.find_by_id(id).await
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<PostDoc>> {
        self.posts.find_by_id(id).await
    }

    async fn update_post_set(
        &self,
        id: &ObjectId,
        update: SetUpdate<PostSet>,
    ) -> Result<Option<PostDoc>> {
        debug!("post {} {:?}", id, update);
        self.posts
            .find_one_and_update(doc! { "_id": id }, update.to_document())
            .await
    }

    async fn update_user_set(
        &self,
        id: &ObjectId,
        update: SetUpdate<UserSet>,
    ) -> Result<Option<UserDoc>> {
        debug!("user {} {:?}", id, update);
        self.users
            .find_one_and_update(doc! { "_id": id }, update.to_document())
            .await
    }

    async fn store_token(
        &self,
        id: &ObjectId,
        purpose: TokenPurpose,
        token: &StoredToken,
    ) -> Result<Option<UserDoc>> {
        let update = doc! {
            "$set": {
                purpose.digest_field(): &token.digest,
                purpose.expiry_field(): bson::DateTime::from_chrono(token.expires_at),
            }
        };
        self.users
            .find_one_and_update(doc! { "_id": id }, update)
            .await
    }

    async fn redeem_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        effect: &TokenEffect,
    ) -> Result<Option<UserDoc>> {
        let purpose = effect.purpose();
        let filter = doc! {
            purpose.digest_field(): digest,
            purpose.expiry_field(): { "$gt": bson::DateTime::from_chrono(now) },
        };

        let set = match effect {
            TokenEffect::MarkVerified => doc! { "is_account_verified": true },
            TokenEffect::ReplaceCredential { password_hash } => doc! {
                "password_hash": password_hash,
                "password_changed_at": bson::DateTime::from_chrono(now),
            },
        };

        let update = doc! {
            "$set": set,
            "$unset": {
                purpose.digest_field(): "",
                purpose.expiry_field(): "",
            },
        };

        self.users.find_one_and_update(filter, update).await
    }
}

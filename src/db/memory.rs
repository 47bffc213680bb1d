//! In-memory entity store
//!
//! A `DashMap` per collection. Every mutation runs while holding the
//! entry's shard lock, which gives the same per-document atomicity the
//! MongoDB operators provide. Used by unit tests and local experiments.

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::db::schemas::{Metadata, PostDoc, UserDoc};
use crate::db::store::{
    EntityStore, PostSet, SetUpdate, StoredToken, TokenEffect, TokenPurpose, UserSet,
};
use crate::types::{Result, ScribeError};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<ObjectId, UserDoc>,
    posts: DashMap<ObjectId, PostDoc>,
    writes: AtomicUsize,
    fail_after: OnceLock<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user, assigning an id when it has none
    pub fn insert_user(&self, mut user: UserDoc) -> ObjectId {
        let id = *user._id.get_or_insert_with(ObjectId::new);
        self.users.insert(id, user);
        id
    }

    /// Insert a post, assigning an id when it has none
    pub fn insert_post(&self, mut post: PostDoc) -> ObjectId {
        let id = *post._id.get_or_insert_with(ObjectId::new);
        self.posts.insert(id, post);
        id
    }

    /// Snapshot of a user, including soft-deleted ones
    pub fn user(&self, id: &ObjectId) -> Option<UserDoc> {
        self.users.get(id).map(|u| u.value().clone())
    }

    /// Snapshot of a post, including soft-deleted ones
    pub fn post(&self, id: &ObjectId) -> Option<PostDoc> {
        self.posts.get(id).map(|p| p.value().clone())
    }

    /// Number of mutating calls served so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every mutating call after the first `allowed` fail with
    /// `StoreUnavailable`
    pub fn fail_writes_after(&self, allowed: usize) {
        let _ = self.fail_after.set(self.write_count() + allowed);
    }

    fn record_write(&self) -> Result<()> {
        let served = self.writes.fetch_add(1, Ordering::SeqCst);
        match self.fail_after.get() {
            Some(&limit) if served >= limit => Err(ScribeError::StoreUnavailable(
                "memory store is refusing writes".into(),
            )),
            _ => Ok(()),
        }
    }
}

fn is_live(metadata: &Metadata) -> bool {
    !metadata.is_deleted
}

fn token_slot(user: &mut UserDoc, purpose: TokenPurpose) -> (&mut Option<String>, &mut Option<bson::DateTime>) {
    match purpose {
        TokenPurpose::Verify => (
            &mut user.account_verification_token,
            &mut user.account_verification_token_expires,
        ),
        TokenPurpose::Reset => (&mut user.password_reset_token, &mut user.password_reset_expires),
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        Ok(self
            .users
            .get(id)
            .filter(|u| is_live(&u.metadata))
            .map(|u| u.value().clone()))
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<PostDoc>> {
        Ok(self
            .posts
            .get(id)
            .filter(|p| is_live(&p.metadata))
            .map(|p| p.value().clone()))
    }

    async fn update_post_set(
        &self,
        id: &ObjectId,
        update: SetUpdate<PostSet>,
    ) -> Result<Option<PostDoc>> {
        self.record_write()?;
        let Some(mut post) = self.posts.get_mut(id) else {
            return Ok(None);
        };
        if !is_live(&post.metadata) {
            return Ok(None);
        }
        let set = match update.field {
            PostSet::Likes => &mut post.likes,
            PostSet::Dislikes => &mut post.dislikes,
        };
        update.apply_to(set);
        post.metadata.touch();
        Ok(Some(post.clone()))
    }

    async fn update_user_set(
        &self,
        id: &ObjectId,
        update: SetUpdate<UserSet>,
    ) -> Result<Option<UserDoc>> {
        self.record_write()?;
        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(None);
        };
        if !is_live(&user.metadata) {
            return Ok(None);
        }
        let set = match update.field {
            UserSet::Followers => &mut user.followers,
            UserSet::Following => &mut user.following,
        };
        update.apply_to(set);
        user.metadata.touch();
        Ok(Some(user.clone()))
    }

    async fn store_token(
        &self,
        id: &ObjectId,
        purpose: TokenPurpose,
        token: &StoredToken,
    ) -> Result<Option<UserDoc>> {
        self.record_write()?;
        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(None);
        };
        if !is_live(&user.metadata) {
            return Ok(None);
        }
        let (digest, expires) = token_slot(&mut user, purpose);
        *digest = Some(token.digest.clone());
        *expires = Some(bson::DateTime::from_chrono(token.expires_at));
        user.metadata.touch();
        Ok(Some(user.clone()))
    }

    async fn redeem_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        effect: &TokenEffect,
    ) -> Result<Option<UserDoc>> {
        self.record_write()?;
        let purpose = effect.purpose();
        let now_bson = bson::DateTime::from_chrono(now);

        for mut entry in self.users.iter_mut() {
            let user = entry.value_mut();
            if !is_live(&user.metadata) {
                continue;
            }
            let (stored, expires) = token_slot(user, purpose);
            let matches = stored.as_deref() == Some(digest)
                && expires.map(|e| e > now_bson).unwrap_or(false);
            if !matches {
                continue;
            }

            *stored = None;
            *expires = None;
            match effect {
                TokenEffect::MarkVerified => user.is_account_verified = true,
                TokenEffect::ReplaceCredential { password_hash } => {
                    user.password_hash = password_hash.clone();
                    user.password_changed_at = Some(now_bson);
                }
            }
            user.metadata.touch();
            return Ok(Some(user.clone()));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> UserDoc {
        UserDoc::new("Test".into(), "User".into(), email.into(), "hash".into())
    }

    #[tokio::test]
    async fn test_soft_deleted_user_is_invisible() {
        let store = MemoryStore::new();
        let mut doc = user("gone@example.com");
        doc.metadata.is_deleted = true;
        let id = store.insert_user(doc);

        assert!(store.find_user(&id).await.unwrap().is_none());
        assert!(store.user(&id).is_some());
    }

    #[tokio::test]
    async fn test_update_missing_post_returns_none() {
        let store = MemoryStore::new();
        let result = store
            .update_post_set(&ObjectId::new(), SetUpdate::add(PostSet::Likes, ObjectId::new()))
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_redeem_respects_purpose() {
        let store = MemoryStore::new();
        let id = store.insert_user(user("a@example.com"));
        let token = StoredToken {
            digest: "abc".into(),
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        };
        store.store_token(&id, TokenPurpose::Verify, &token).await.unwrap();

        // A verify digest can't be redeemed as a reset
        let reset = TokenEffect::ReplaceCredential {
            password_hash: "new".into(),
        };
        assert!(store.redeem_token("abc", Utc::now(), &reset).await.unwrap().is_none());

        let verified = store
            .redeem_token("abc", Utc::now(), &TokenEffect::MarkVerified)
            .await
            .unwrap()
            .unwrap();
        assert!(verified.is_account_verified);
        assert!(verified.account_verification_token.is_none());
    }

    #[tokio::test]
    async fn test_fail_writes_after() {
        let store = MemoryStore::new();
        let post = ObjectId::new();
        store.fail_writes_after(1);

        let first = store
            .update_post_set(&post, SetUpdate::add(PostSet::Likes, ObjectId::new()))
            .await;
        assert!(first.is_ok());

        let err = store
            .update_post_set(&post, SetUpdate::add(PostSet::Likes, ObjectId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::StoreUnavailable(_)));
    }
}

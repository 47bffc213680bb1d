//! Follow / unfollow bookkeeping
//!
//! An edge X→Y lives on both records: X in `followers(Y)` and Y in
//! `following(X)`. The two writes are independent single-document updates
//! with no transaction around them; the target side is written first.

use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::UserDoc;
use crate::db::store::{EntityStore, SetUpdate, UserSet};
use crate::types::{parse_object_id, Result, ScribeError};

/// Both sides of an edge after a follow state change
#[derive(Debug, Clone)]
pub struct FollowOutcome {
    pub actor: UserDoc,
    pub target: UserDoc,
}

#[derive(Clone)]
pub struct FollowService {
    store: Arc<dyn EntityStore>,
}

impl FollowService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Make `actor_id` follow (`want_follow = true`) or stop following
    /// `target_id`.
    ///
    /// Fails with `SelfReference` when both ids are equal and
    /// `AlreadyInState` when the edge is already as requested.
    pub async fn set_follow_state(
        &self,
        actor_id: &str,
        target_id: &str,
        want_follow: bool,
    ) -> Result<FollowOutcome> {
        let actor = parse_object_id(actor_id)?;
        let target = parse_object_id(target_id)?;

        if actor == target {
            return Err(ScribeError::SelfReference(if want_follow {
                "You cannot follow yourself".into()
            } else {
                "You cannot unfollow yourself".into()
            }));
        }

        let target_doc = self
            .store
            .find_user(&target)
            .await?
            .ok_or_else(|| ScribeError::NotFound(format!("User {} not found", target_id)))?;
        if self.store.find_user(&actor).await?.is_none() {
            return Err(ScribeError::NotFound(format!("User {} not found", actor_id)));
        }

        let following = target_doc.is_followed_by(&actor);
        if following == want_follow {
            return Err(ScribeError::AlreadyInState(if want_follow {
                "You are already following this user".into()
            } else {
                "You are not following this user".into()
            }));
        }

        let (on_target, on_actor) = if want_follow {
            (
                SetUpdate::add(UserSet::Followers, actor),
                SetUpdate::add(UserSet::Following, target),
            )
        } else {
            (
                SetUpdate::remove(UserSet::Followers, actor),
                SetUpdate::remove(UserSet::Following, target),
            )
        };

        let target_doc = self
            .store
            .update_user_set(&target, on_target)
            .await?
            .ok_or_else(|| ScribeError::NotFound(format!("User {} not found", target_id)))?;

        let actor_doc = match self.store.update_user_set(&actor, on_actor).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                warn!(
                    "Follow edge {} -> {} half written: actor record missing",
                    actor, target
                );
                return Err(ScribeError::NotFound(format!("User {} not found", actor_id)));
            }
            Err(e) => {
                warn!("Follow edge {} -> {} half written: {}", actor, target, e);
                return Err(e);
            }
        };

        info!(
            "User {} {} {}",
            actor,
            if want_follow { "followed" } else { "unfollowed" },
            target
        );

        Ok(FollowOutcome {
            actor: actor_doc,
            target: target_doc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use bson::oid::ObjectId;

    fn user(email: &str) -> UserDoc {
        UserDoc::new("Test".into(), "User".into(), email.into(), "hash".into())
    }

    fn setup() -> (Arc<MemoryStore>, FollowService, ObjectId, ObjectId) {
        let store = Arc::new(MemoryStore::new());
        let x = store.insert_user(user("x@example.com"));
        let y = store.insert_user(user("y@example.com"));
        let service = FollowService::new(store.clone());
        (store, service, x, y)
    }

    #[tokio::test]
    async fn test_follow_updates_both_sides() {
        let (store, service, x, y) = setup();

        let outcome = service.set_follow_state(&x.to_hex(), &y.to_hex(), true).await.unwrap();
        assert_eq!(outcome.target.followers, vec![x]);
        assert_eq!(outcome.actor.following, vec![y]);

        assert!(store.user(&y).unwrap().followers.contains(&x));
        assert!(store.user(&x).unwrap().following.contains(&y));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_follow_twice_is_already_in_state() {
        let (store, service, x, y) = setup();
        service.set_follow_state(&x.to_hex(), &y.to_hex(), true).await.unwrap();

        let err = service
            .set_follow_state(&x.to_hex(), &y.to_hex(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::AlreadyInState(_)));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_unfollow_without_edge_is_already_in_state() {
        let (_store, service, x, y) = setup();
        let err = service
            .set_follow_state(&x.to_hex(), &y.to_hex(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::AlreadyInState(_)));
    }

    #[tokio::test]
    async fn test_follow_then_unfollow_clears_both_sides() {
        let (store, service, x, y) = setup();
        service.set_follow_state(&x.to_hex(), &y.to_hex(), true).await.unwrap();
        service.set_follow_state(&x.to_hex(), &y.to_hex(), false).await.unwrap();

        assert!(store.user(&y).unwrap().followers.is_empty());
        assert!(store.user(&x).unwrap().following.is_empty());
    }

    #[tokio::test]
    async fn test_self_follow_rejected() {
        let (store, service, x, _) = setup();
        for want in [true, false] {
            let err = service
                .set_follow_state(&x.to_hex(), &x.to_hex(), want)
                .await
                .unwrap_err();
            assert!(matches!(err, ScribeError::SelfReference(_)));
        }
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_self_follow_rejected_even_for_unknown_user() {
        let (_store, service, _, _) = setup();
        let ghost = ObjectId::new().to_hex();
        let err = service.set_follow_state(&ghost, &ghost, true).await.unwrap_err();
        assert!(matches!(err, ScribeError::SelfReference(_)));
    }

    #[tokio::test]
    async fn test_missing_target() {
        let (_store, service, x, _) = setup();
        let err = service
            .set_follow_state(&x.to_hex(), &ObjectId::new().to_hex(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_actor_writes_nothing() {
        let (store, service, _, y) = setup();
        let ghost = ObjectId::new();

        let err = service
            .set_follow_state(&ghost.to_hex(), &y.to_hex(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::NotFound(_)));
        assert!(store.user(&y).unwrap().followers.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_soft_deleted_actor_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut gone = user("gone@example.com");
        gone.metadata.is_deleted = true;
        let x = store.insert_user(gone);
        let y = store.insert_user(user("y@example.com"));
        let service = FollowService::new(store.clone());

        let err = service
            .set_follow_state(&x.to_hex(), &y.to_hex(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::NotFound(_)));
        assert!(store.user(&y).unwrap().followers.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_on_first_write() {
        let (store, service, x, y) = setup();
        store.fail_writes_after(0);

        let err = service
            .set_follow_state(&x.to_hex(), &y.to_hex(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::StoreUnavailable(_)));
        assert!(store.user(&y).unwrap().followers.is_empty());
        assert!(store.user(&x).unwrap().following.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_on_second_write_is_returned() {
        let (store, service, x, y) = setup();
        store.fail_writes_after(1);

        let err = service
            .set_follow_state(&x.to_hex(), &y.to_hex(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::StoreUnavailable(_)));

        // Target side landed before the failure; no compensation
        assert!(store.user(&y).unwrap().followers.contains(&x));
        assert!(store.user(&x).unwrap().following.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_ids() {
        let (_store, service, x, _) = setup();
        let err = service.set_follow_state(&x.to_hex(), "bad", true).await.unwrap_err();
        assert!(matches!(err, ScribeError::InvalidIdentifier(_)));
    }
}

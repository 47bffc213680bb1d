//! Like / dislike toggling
//!
//! A user's reaction to a post is one of three states. Requesting the
//! reaction you already hold clears it; requesting the other one switches
//! over. The transition is computed by a pure function and then turned
//! into the smallest set of `$addToSet`/`$pull` writes that moves the
//! stored sets from what was read to what was decided.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::schemas::PostDoc;
use crate::db::store::{EntityStore, PostSet, SetUpdate};
use crate::types::{parse_object_id, Result, ScribeError};

/// A reaction a user can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    fn set(self) -> PostSet {
        match self {
            Reaction::Like => PostSet::Likes,
            Reaction::Dislike => PostSet::Dislikes,
        }
    }
}

/// Where one user stands on one post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReactionState {
    Neither,
    Liked,
    Disliked,
}

impl ReactionState {
    /// Read a user's state off a post.
    ///
    /// A user found in both sets is reported as `Liked`; the next toggle
    /// then rewrites both sets, so the overlap is repaired either way.
    pub fn of(post: &PostDoc, user: &ObjectId) -> Self {
        if post.likes.contains(user) {
            ReactionState::Liked
        } else if post.dislikes.contains(user) {
            ReactionState::Disliked
        } else {
            ReactionState::Neither
        }
    }

    /// State after requesting `reaction`
    pub fn toggle(self, reaction: Reaction) -> Self {
        match (self, reaction) {
            (ReactionState::Liked, Reaction::Like) => ReactionState::Neither,
            (ReactionState::Disliked, Reaction::Dislike) => ReactionState::Neither,
            (_, Reaction::Like) => ReactionState::Liked,
            (_, Reaction::Dislike) => ReactionState::Disliked,
        }
    }

    fn in_set(self, set: PostSet) -> bool {
        matches!(
            (self, set),
            (ReactionState::Liked, PostSet::Likes) | (ReactionState::Disliked, PostSet::Dislikes)
        )
    }
}

/// Writes that take `post` to `target` for `user`.
///
/// The opposite set is always cleared before the requested set is touched.
pub fn plan_writes(
    post: &PostDoc,
    user: &ObjectId,
    reaction: Reaction,
    target: ReactionState,
) -> Vec<SetUpdate<PostSet>> {
    let requested = reaction.set();
    let opposite = match requested {
        PostSet::Likes => PostSet::Dislikes,
        PostSet::Dislikes => PostSet::Likes,
    };

    let mut writes = Vec::with_capacity(2);
    for set in [opposite, requested] {
        let present = match set {
            PostSet::Likes => post.likes.contains(user),
            PostSet::Dislikes => post.dislikes.contains(user),
        };
        let wanted = target.in_set(set);
        if present && !wanted {
            writes.push(SetUpdate::remove(set, *user));
        } else if !present && wanted {
            writes.push(SetUpdate::add(set, *user));
        }
    }
    writes
}

/// Result of a toggle
#[derive(Debug, Clone)]
pub struct ReactionOutcome {
    pub post: PostDoc,
    pub state: ReactionState,
}

/// Applies reaction toggles through an [`EntityStore`]
#[derive(Clone)]
pub struct ReactionEngine {
    store: Arc<dyn EntityStore>,
}

impl ReactionEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Toggle `reaction` by `actor_id` on `post_id`, returning the post as
    /// stored after the last write.
    pub async fn toggle(
        &self,
        actor_id: &str,
        post_id: &str,
        reaction: Reaction,
    ) -> Result<ReactionOutcome> {
        let actor = parse_object_id(actor_id)?;
        let post_oid = parse_object_id(post_id)?;

        let post = self
            .store
            .find_post(&post_oid)
            .await?
            .ok_or_else(|| ScribeError::NotFound(format!("Post {} not found", post_id)))?;

        let current = ReactionState::of(&post, &actor);
        let next = current.toggle(reaction);
        let writes = plan_writes(&post, &actor, reaction, next);
        debug!(
            "reaction {:?} by {} on {}: {:?} -> {:?} ({} writes)",
            reaction,
            actor,
            post_oid,
            current,
            next,
            writes.len()
        );

        let mut latest = post;
        for write in writes {
            latest = self
                .store
                .update_post_set(&post_oid, write)
                .await?
                .ok_or_else(|| ScribeError::NotFound(format!("Post {} not found", post_id)))?;
        }

        info!("User {} {:?} post {} -> {:?}", actor, reaction, post_oid, next);

        Ok(ReactionOutcome {
            post: latest,
            state: next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn post_with(likes: Vec<ObjectId>, dislikes: Vec<ObjectId>) -> PostDoc {
        let mut post = PostDoc::new(ObjectId::new(), "Title".into(), "Body".into(), None);
        post.likes = likes;
        post.dislikes = dislikes;
        post
    }

    fn setup() -> (Arc<MemoryStore>, ReactionEngine, String, String) {
        let store = Arc::new(MemoryStore::new());
        let post_id = store.insert_post(post_with(vec![], vec![]));
        let engine = ReactionEngine::new(store.clone());
        (store, engine, ObjectId::new().to_hex(), post_id.to_hex())
    }

    #[test]
    fn test_toggle_table() {
        use Reaction::*;
        use ReactionState::*;
        assert_eq!(Neither.toggle(Like), Liked);
        assert_eq!(Neither.toggle(Dislike), Disliked);
        assert_eq!(Liked.toggle(Like), Neither);
        assert_eq!(Liked.toggle(Dislike), Disliked);
        assert_eq!(Disliked.toggle(Dislike), Neither);
        assert_eq!(Disliked.toggle(Like), Liked);
    }

    #[test]
    fn test_switching_plans_two_writes_opposite_first() {
        let user = ObjectId::new();
        let post = post_with(vec![user], vec![]);
        let writes = plan_writes(&post, &user, Reaction::Dislike, ReactionState::Disliked);
        assert_eq!(
            writes,
            vec![
                SetUpdate::remove(PostSet::Likes, user),
                SetUpdate::add(PostSet::Dislikes, user),
            ]
        );
    }

    #[test]
    fn test_fresh_like_plans_one_write() {
        let user = ObjectId::new();
        let post = post_with(vec![], vec![]);
        let writes = plan_writes(&post, &user, Reaction::Like, ReactionState::Liked);
        assert_eq!(writes, vec![SetUpdate::add(PostSet::Likes, user)]);
    }

    #[test]
    fn test_overlap_is_repaired() {
        let user = ObjectId::new();
        let post = post_with(vec![user], vec![user]);
        let current = ReactionState::of(&post, &user);
        let next = current.toggle(Reaction::Like);
        assert_eq!(next, ReactionState::Neither);
        let writes = plan_writes(&post, &user, Reaction::Like, next);
        assert_eq!(
            writes,
            vec![
                SetUpdate::remove(PostSet::Dislikes, user),
                SetUpdate::remove(PostSet::Likes, user),
            ]
        );
    }

    #[tokio::test]
    async fn test_double_like_is_off() {
        let (store, engine, actor, post_id) = setup();

        let first = engine.toggle(&actor, &post_id, Reaction::Like).await.unwrap();
        assert_eq!(first.state, ReactionState::Liked);
        assert_eq!(first.post.likes.len(), 1);

        let second = engine.toggle(&actor, &post_id, Reaction::Like).await.unwrap();
        assert_eq!(second.state, ReactionState::Neither);

        let stored = store.post(&parse_object_id(&post_id).unwrap()).unwrap();
        assert!(stored.likes.is_empty());
        assert!(stored.dislikes.is_empty());
    }

    #[tokio::test]
    async fn test_like_dislike_dislike_scenario() {
        let (store, engine, actor, post_id) = setup();
        let actor_oid = parse_object_id(&actor).unwrap();
        let post_oid = parse_object_id(&post_id).unwrap();

        engine.toggle(&actor, &post_id, Reaction::Like).await.unwrap();
        assert!(store.post(&post_oid).unwrap().likes.contains(&actor_oid));

        let writes_before = store.write_count();
        let outcome = engine.toggle(&actor, &post_id, Reaction::Dislike).await.unwrap();
        assert_eq!(store.write_count() - writes_before, 2);
        assert!(!outcome.post.likes.contains(&actor_oid));
        assert!(outcome.post.dislikes.contains(&actor_oid));

        let outcome = engine.toggle(&actor, &post_id, Reaction::Dislike).await.unwrap();
        assert!(!outcome.post.likes.contains(&actor_oid));
        assert!(!outcome.post.dislikes.contains(&actor_oid));
        assert_eq!(outcome.state, ReactionState::Neither);
    }

    #[tokio::test]
    async fn test_never_in_both_sets() {
        let (_store, engine, actor, post_id) = setup();
        let actor_oid = parse_object_id(&actor).unwrap();
        let sequence = [
            Reaction::Dislike,
            Reaction::Like,
            Reaction::Like,
            Reaction::Dislike,
            Reaction::Like,
            Reaction::Dislike,
        ];
        for reaction in sequence {
            let post = engine.toggle(&actor, &post_id, reaction).await.unwrap().post;
            assert!(!(post.likes.contains(&actor_oid) && post.dislikes.contains(&actor_oid)));
        }
    }

    #[tokio::test]
    async fn test_other_users_untouched() {
        let store = Arc::new(MemoryStore::new());
        let other = ObjectId::new();
        let post_id = store.insert_post(post_with(vec![other], vec![]));
        let engine = ReactionEngine::new(store.clone());

        let actor = ObjectId::new().to_hex();
        let post = engine
            .toggle(&actor, &post_id.to_hex(), Reaction::Dislike)
            .await
            .unwrap()
            .post;
        assert_eq!(post.likes, vec![other]);
        assert_eq!(post.dislikes.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected_before_store() {
        let (store, engine, actor, post_id) = setup();

        let err = engine.toggle("nope", &post_id, Reaction::Like).await.unwrap_err();
        assert!(matches!(err, ScribeError::InvalidIdentifier(_)));

        let err = engine.toggle(&actor, "123", Reaction::Like).await.unwrap_err();
        assert!(matches!(err, ScribeError::InvalidIdentifier(_)));

        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_post() {
        let (_store, engine, actor, _) = setup();
        let err = engine
            .toggle(&actor, &ObjectId::new().to_hex(), Reaction::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_failure_is_returned() {
        let (store, engine, actor, post_id) = setup();
        store.fail_writes_after(0);

        let err = engine.toggle(&actor, &post_id, Reaction::Like).await.unwrap_err();
        assert!(matches!(err, ScribeError::StoreUnavailable(_)));
        assert!(store.post(&parse_object_id(&post_id).unwrap()).unwrap().likes.is_empty());
    }
}

//! Post routes (`/api/posts`)
//!
//! - POST / (create), GET / (list, `?category=`)
//! - GET /{id} (counts a view), PUT /{id}, DELETE /{id}
//! - PUT /like, PUT /dislike with `{ postId }`

use bson::{doc, Document};
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::PostDoc;
use crate::routes::views::PostView;
use crate::routes::{
    created_json, method_not_allowed, not_found_response, ok_json, parse_json_body, parse_query,
    path_segments, require_fields, respond, BoxBody, MessageResponse, PostIdRequest, RouteResult,
};
use crate::server::AppState;
use crate::services::{is_profane, Reaction, ReactionState};
use crate::types::{parse_object_id, ScribeError};

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl UpdatePostRequest {
    fn to_set(&self) -> Document {
        let mut set = Document::new();
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
        ] {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                set.insert(field, v);
            }
        }
        set
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub category: Option<String>,
}

impl PostListQuery {
    fn filter(&self) -> Document {
        match self.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => doc! { "category": c },
            _ => doc! {},
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    #[serde(flatten)]
    pub post: PostView,
    pub reaction: ReactionState,
}

/// POST /api/posts
async fn handle_create(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let author = state.auth(req.headers()).await?;
    author.ensure_not_blocked()?;
    let body: CreatePostRequest = parse_json_body(req).await?;
    require_fields(&[
        ("title", body.title.as_str()),
        ("description", body.description.as_str()),
    ])?;

    if is_profane(&[body.title.as_str(), body.description.as_str()]) {
        state
            .db
            .users
            .update_one(doc! { "_id": author.id }, doc! { "$set": { "is_blocked": true } })
            .await?;
        warn!("User {} blocked for profane post", author.id);
        return Err(ScribeError::Forbidden(
            "Creating failed because it contains profane words and you have been blocked".into(),
        ));
    }

    let mut post = PostDoc::new(author.id, body.title, body.description, body.category);
    let id = state.db.posts.insert_one(post.clone()).await?;
    post._id = Some(id);

    state
        .db
        .users
        .update_one(doc! { "_id": author.id }, doc! { "$inc": { "post_count": 1 } })
        .await?;

    info!("Post {} created by {}", id, author.id);
    created_json(&PostView::from(&post))
}

/// GET /api/posts
async fn handle_list(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let query: PostListQuery = parse_query(req.uri().query())?;
    let posts = state
        .db
        .posts
        .find_many(query.filter(), Some(doc! { "metadata.created_at": -1 }))
        .await?;
    let views: Vec<PostView> = posts.iter().map(PostView::from).collect();
    ok_json(&views)
}

/// GET /api/posts/{id}
async fn handle_fetch(state: &AppState, id: &str) -> RouteResult {
    let oid = parse_object_id(id)?;
    let post = state
        .db
        .posts
        .find_one_and_update(doc! { "_id": oid }, doc! { "$inc": { "num_views": 1 } })
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("Post {} not found", id)))?;

    let comments = state
        .db
        .comments
        .find_many(doc! { "post": oid }, Some(doc! { "metadata.created_at": -1 }))
        .await?;

    ok_json(&PostView::from(&post).with_comments(&comments))
}

/// PUT /api/posts/{id}
async fn handle_update(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    caller.ensure_not_blocked()?;
    let oid = parse_object_id(id)?;

    let existing = state
        .db
        .posts
        .find_by_id(&oid)
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("Post {} not found", id)))?;
    caller.ensure_owner_or_admin(&existing.user)?;

    let body: UpdatePostRequest = parse_json_body(req).await?;
    let set = body.to_set();
    if set.is_empty() {
        return Err(ScribeError::BadRequest("Nothing to update".into()));
    }
    let texts: Vec<&str> = set.values().filter_map(|v| v.as_str()).collect();
    if is_profane(&texts) {
        return Err(ScribeError::BadRequest(
            "Update failed because it contains profane words".into(),
        ));
    }

    let post = state
        .db
        .posts
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("Post {} not found", id)))?;

    ok_json(&PostView::from(&post))
}

/// DELETE /api/posts/{id}
async fn handle_delete(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    let oid = parse_object_id(id)?;

    let existing = state
        .db
        .posts
        .find_by_id(&oid)
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("Post {} not found", id)))?;
    caller.ensure_owner_or_admin(&existing.user)?;

    state.db.posts.soft_delete(doc! { "_id": oid }).await?;
    state
        .db
        .users
        .update_one(
            doc! { "_id": existing.user, "post_count": { "$gt": 0 } },
            doc! { "$inc": { "post_count": -1 } },
        )
        .await?;

    info!("Post {} deleted by {}", oid, caller.id);
    ok_json(&MessageResponse::new("Post deleted"))
}

/// PUT /api/posts/like and /dislike
async fn handle_reaction(req: Request<Incoming>, state: &AppState, reaction: Reaction) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    let body: PostIdRequest = parse_json_body(req).await?;
    require_fields(&[("postId", body.post_id.as_str())])?;

    let outcome = state
        .reactions
        .toggle(&caller.id_hex(), &body.post_id, reaction)
        .await?;

    ok_json(&ReactionResponse {
        post: PostView::from(&outcome.post),
        reaction: outcome.state,
    })
}

/// Handle `/api/posts/*` requests
pub async fn handle_post_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let Some(segments) = path_segments(&path, "/api/posts") else {
        return not_found_response(&path);
    };

    let result = match (&method, segments.as_slice()) {
        (&Method::POST, []) => handle_create(req, &state).await,
        (&Method::GET, []) => handle_list(req, &state).await,
        (&Method::PUT, ["like"]) => handle_reaction(req, &state, Reaction::Like).await,
        (&Method::PUT, ["dislike"]) => handle_reaction(req, &state, Reaction::Dislike).await,
        (&Method::GET, [id]) => handle_fetch(&state, id).await,
        (&Method::PUT, [id]) => handle_update(req, &state, id).await,
        (&Method::DELETE, [id]) => handle_delete(req, &state, id).await,

        (_, []) | (_, [_]) => return method_not_allowed(),
        _ => return not_found_response(&path),
    };

    respond(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filter() {
        assert!(PostListQuery::default().filter().is_empty());
        let q = PostListQuery {
            category: Some(" Travel ".into()),
        };
        assert_eq!(q.filter().get_str("category").unwrap(), "Travel");
        let blank = PostListQuery {
            category: Some("  ".into()),
        };
        assert!(blank.filter().is_empty());
    }

    #[test]
    fn test_update_set_ignores_blank() {
        let body: UpdatePostRequest =
            serde_json::from_str(r#"{"title":" New ","description":"","category":null}"#).unwrap();
        let set = body.to_set();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get_str("title").unwrap(), "New");
    }

    #[test]
    fn test_reaction_response_shape() {
        let post = PostDoc::new(bson::oid::ObjectId::new(), "T".into(), "D".into(), None);
        let json = serde_json::to_value(ReactionResponse {
            post: PostView::from(&post),
            reaction: ReactionState::Liked,
        })
        .unwrap();
        assert_eq!(json["reaction"], "liked");
        assert_eq!(json["title"], "T");
    }
}

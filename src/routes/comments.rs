//! Comment routes (`/api/comments`)

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::CommentDoc;
use crate::routes::views::CommentView;
use crate::routes::{
    created_json, method_not_allowed, not_found_response, ok_json, parse_json_body,
    path_segments, require_fields, respond, BoxBody, MessageResponse, RouteResult,
};
use crate::server::AppState;
use crate::types::{parse_object_id, ScribeError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    #[serde(default)]
    pub description: String,
}

async fn load(state: &AppState, id: &str) -> Result<CommentDoc, ScribeError> {
    let oid = parse_object_id(id)?;
    state
        .db
        .comments
        .find_by_id(&oid)
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("Comment {} not found", id)))
}

async fn handle_create(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let author = state.auth(req.headers()).await?;
    author.ensure_not_blocked()?;
    let body: CreateCommentRequest = parse_json_body(req).await?;
    require_fields(&[
        ("postId", body.post_id.as_str()),
        ("description", body.description.as_str()),
    ])?;

    let post_id = parse_object_id(&body.post_id)?;
    if state.db.posts.find_by_id(&post_id).await?.is_none() {
        return Err(ScribeError::NotFound(format!("Post {} not found", body.post_id)));
    }

    let mut comment = CommentDoc::new(post_id, author.id, body.description.trim().to_string());
    let id = state.db.comments.insert_one(comment.clone()).await?;
    comment._id = Some(id);

    info!("Comment {} on post {} by {}", id, post_id, author.id);
    created_json(&CommentView::from(&comment))
}

async fn handle_list(req: Request<Incoming>, state: &AppState) -> RouteResult {
    state.auth(req.headers()).await?;
    let comments = state
        .db
        .comments
        .find_many(doc! {}, Some(doc! { "metadata.created_at": -1 }))
        .await?;
    let views: Vec<CommentView> = comments.iter().map(CommentView::from).collect();
    ok_json(&views)
}

async fn handle_fetch(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    state.auth(req.headers()).await?;
    ok_json(&CommentView::from(&load(state, id).await?))
}

/// Only the author may edit a comment
async fn handle_update(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    caller.ensure_not_blocked()?;
    let existing = load(state, id).await?;
    if existing.user != caller.id {
        return Err(ScribeError::Forbidden(
            "You can only edit your own comments".into(),
        ));
    }

    let body: UpdateCommentRequest = parse_json_body(req).await?;
    require_fields(&[("description", body.description.as_str())])?;

    let comment = state
        .db
        .comments
        .find_one_and_update(
            doc! { "_id": existing._id },
            doc! { "$set": { "description": body.description.trim() } },
        )
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("Comment {} not found", id)))?;

    ok_json(&CommentView::from(&comment))
}

async fn handle_delete(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    let existing = load(state, id).await?;
    caller.ensure_owner_or_admin(&existing.user)?;

    state
        .db
        .comments
        .soft_delete(doc! { "_id": existing._id })
        .await?;
    ok_json(&MessageResponse::new("Comment deleted"))
}

/// Handle `/api/comments/*` requests
pub async fn handle_comment_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let Some(segments) = path_segments(&path, "/api/comments") else {
        return not_found_response(&path);
    };

    let result = match (&method, segments.as_slice()) {
        (&Method::POST, []) => handle_create(req, &state).await,
        (&Method::GET, []) => handle_list(req, &state).await,
        (&Method::GET, [id]) => handle_fetch(req, &state, id).await,
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
    fn test_create_request_fields() {
        let body: CreateCommentRequest =
            serde_json::from_str(r#"{"postId":"65f0c0ffee0000000000abcd","description":"Nice"}"#)
                .unwrap();
        assert_eq!(body.post_id, "65f0c0ffee0000000000abcd");
        assert!(parse_object_id(&body.post_id).is_ok());

        let empty: CreateCommentRequest = serde_json::from_str("{}").unwrap();
        assert!(require_fields(&[("postId", empty.post_id.as_str())]).is_err());
    }
}

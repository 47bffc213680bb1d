//! Category routes (`/api/category`)

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::AuthUser;
use crate::db::schemas::CategoryDoc;
use crate::routes::views::CategoryView;
use crate::routes::{
    created_json, method_not_allowed, not_found_response, ok_json, parse_json_body,
    path_segments, require_fields, respond, BoxBody, MessageResponse, RouteResult,
};
use crate::server::AppState;
use crate::types::{parse_object_id, ScribeError};

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub title: String,
}

/// Create, rename and delete are all closed to blocked users
fn authorize_write(caller: &AuthUser) -> Result<(), ScribeError> {
    caller.ensure_not_blocked()
}

async fn handle_create(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    authorize_write(&caller)?;
    let body: CategoryRequest = parse_json_body(req).await?;
    require_fields(&[("title", body.title.as_str())])?;

    let mut category = CategoryDoc::new(caller.id, body.title);
    let id = state.db.categories.insert_one(category.clone()).await?;
    category._id = Some(id);

    info!("Category '{}' created by {}", category.title, caller.id);
    created_json(&CategoryView::from(&category))
}

async fn handle_list(req: Request<Incoming>, state: &AppState) -> RouteResult {
    state.auth(req.headers()).await?;
    let categories = state
        .db
        .categories
        .find_many(doc! {}, Some(doc! { "metadata.created_at": -1 }))
        .await?;
    let views: Vec<CategoryView> = categories.iter().map(CategoryView::from).collect();
    ok_json(&views)
}

async fn handle_fetch(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    state.auth(req.headers()).await?;
    let oid = parse_object_id(id)?;
    let category = state
        .db
        .categories
        .find_by_id(&oid)
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("Category {} not found", id)))?;
    ok_json(&CategoryView::from(&category))
}

async fn handle_update(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    authorize_write(&caller)?;
    let oid = parse_object_id(id)?;
    let body: CategoryRequest = parse_json_body(req).await?;
    require_fields(&[("title", body.title.as_str())])?;

    let category = state
        .db
        .categories
        .find_one_and_update(
            doc! { "_id": oid },
            doc! { "$set": { "title": body.title.trim() } },
        )
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("Category {} not found", id)))?;
    ok_json(&CategoryView::from(&category))
}

async fn handle_delete(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    authorize_write(&caller)?;
    let oid = parse_object_id(id)?;
    let result = state.db.categories.soft_delete(doc! { "_id": oid }).await?;
    if result.matched_count == 0 {
        return Err(ScribeError::NotFound(format!("Category {} not found", id)));
    }
    ok_json(&MessageResponse::new("Category deleted"))
}

/// Handle `/api/category/*` requests
pub async fn handle_category_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let Some(segments) = path_segments(&path, "/api/category") else {
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

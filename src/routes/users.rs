//! User routes (`/api/users`)
//!
//! - POST /register, POST /login
//! - GET / , GET /{id}, DELETE /{id}
//! - GET /profile/{id}, PUT /profile, PUT /password
//! - PUT /follow, PUT /unfollow
//! - PUT /block-user/{id}, PUT /unblock-user/{id}
//! - POST /generate-verify-email-token, POST /verify-user
//! - POST /forget-password, PUT /reset-password

use bson::{doc, Document};
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{check_password_strength, hash_password, verify_password, TokenInput};
use crate::db::schemas::UserDoc;
use crate::db::TokenPurpose;
use crate::routes::views::UserView;
use crate::routes::{
    created_json, method_not_allowed, not_found_response, ok_json, parse_json_body,
    path_segments, require_fields, respond, BoxBody, MessageResponse, RouteResult,
};
use crate::server::AppState;
use crate::services::{reset_mail, verification_mail, Redemption};
use crate::types::{parse_object_id, ScribeError};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserView,
    pub token: String,
    pub expires_at: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    #[serde(default, alias = "followedId")]
    pub follow_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfollowRequest {
    #[serde(default)]
    pub unfollow_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgetPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UpdateProfileRequest {
    /// `$set` stage for the provided, non-blank fields
    fn to_set(&self) -> Document {
        let mut set = Document::new();
        if let Some(v) = self.first_name.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            set.insert("first_name", v);
        }
        if let Some(v) = self.last_name.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            set.insert("last_name", v);
        }
        if let Some(v) = self.email.as_deref().map(normalize_email).filter(|v| !v.is_empty()) {
            set.insert("email", v);
        }
        if let Some(v) = self.bio.as_deref() {
            set.insert("bio", v.trim());
        }
        set
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/users/register
async fn handle_register(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let body: RegisterRequest = parse_json_body(req).await?;
    require_fields(&[
        ("firstName", body.first_name.as_str()),
        ("lastName", body.last_name.as_str()),
        ("email", body.email.as_str()),
        ("password", body.password.as_str()),
    ])?;
    check_password_strength(&body.password)?;

    let email = normalize_email(&body.email);
    if state.db.users.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(ScribeError::Conflict("User already exists".into()));
    }

    let mut user = UserDoc::new(
        body.first_name.trim().to_string(),
        body.last_name.trim().to_string(),
        email,
        hash_password(&body.password)?,
    );
    let id = state.db.users.insert_one(user.clone()).await?;
    user._id = Some(id);

    info!("Registered user {} ({})", id, user.email);
    created_json(&UserView::from(&user))
}

/// POST /api/users/login
async fn handle_login(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let body: LoginRequest = parse_json_body(req).await?;
    require_fields(&[("email", body.email.as_str()), ("password", body.password.as_str())])?;

    let invalid = || ScribeError::Unauthorized("Invalid login credentials".into());

    let email = normalize_email(&body.email);
    let user = state
        .db
        .users
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(invalid());
    }

    let id = user
        ._id
        .ok_or_else(|| ScribeError::Internal("Stored user has no id".into()))?;
    let token = state.jwt.generate_token(TokenInput {
        user_id: id.to_hex(),
        email: user.email.clone(),
        permission_level: user.permission_level(),
    })?;
    let expires_at = state.jwt.verify_token(&token).map(|c| c.exp).unwrap_or(0);

    info!("Login successful: {}", user.email);
    ok_json(&LoginResponse {
        user: UserView::from(&user),
        token,
        expires_at,
    })
}

/// GET /api/users
async fn handle_list(req: Request<Incoming>, state: &AppState) -> RouteResult {
    state.auth(req.headers()).await?;
    let users = state
        .db
        .users
        .find_many(doc! {}, Some(doc! { "metadata.created_at": -1 }))
        .await?;
    let views: Vec<UserView> = users.iter().map(UserView::from).collect();
    ok_json(&views)
}

/// GET /api/users/{id}
async fn handle_fetch(state: &AppState, id: &str) -> RouteResult {
    let oid = parse_object_id(id)?;
    let user = state
        .db
        .users
        .find_by_id(&oid)
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("User {} not found", id)))?;
    ok_json(&UserView::from(&user))
}

/// DELETE /api/users/{id}
async fn handle_delete(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    caller.require_admin()?;
    let oid = parse_object_id(id)?;

    let result = state.db.users.soft_delete(doc! { "_id": oid }).await?;
    if result.matched_count == 0 {
        return Err(ScribeError::NotFound(format!("User {} not found", id)));
    }

    info!("User {} deleted by {}", oid, caller.id);
    ok_json(&MessageResponse::new("User deleted"))
}

/// GET /api/users/profile/{id}
async fn handle_profile(req: Request<Incoming>, state: &AppState, id: &str) -> RouteResult {
    let viewer = state.auth(req.headers()).await?;
    let oid = parse_object_id(id)?;

    let user = if viewer.id != oid {
        state
            .db
            .users
            .find_one_and_update(doc! { "_id": oid }, doc! { "$addToSet": { "viewed_by": viewer.id } })
            .await?
    } else {
        state.db.users.find_by_id(&oid).await?
    }
    .ok_or_else(|| ScribeError::NotFound(format!("User {} not found", id)))?;

    let posts = state
        .db
        .posts
        .find_many(doc! { "user": oid }, Some(doc! { "metadata.created_at": -1 }))
        .await?;

    ok_json(&UserView::from(&user).with_posts(&posts))
}

/// PUT /api/users/profile
async fn handle_update_profile(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    caller.ensure_not_blocked()?;
    let body: UpdateProfileRequest = parse_json_body(req).await?;

    let set = body.to_set();
    if set.is_empty() {
        return Err(ScribeError::BadRequest("Nothing to update".into()));
    }

    if let Ok(email) = set.get_str("email") {
        let taken = state
            .db
            .users
            .find_one(doc! { "email": email, "_id": { "$ne": caller.id } })
            .await?;
        if taken.is_some() {
            return Err(ScribeError::Conflict("Email is already in use".into()));
        }
    }

    let user = state
        .db
        .users
        .find_one_and_update(doc! { "_id": caller.id }, doc! { "$set": set })
        .await?
        .ok_or_else(|| ScribeError::NotFound("User not found".into()))?;

    ok_json(&UserView::from(&user))
}

/// PUT /api/users/password
async fn handle_update_password(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    let body: PasswordRequest = parse_json_body(req).await?;
    check_password_strength(&body.password)?;

    let update = doc! {
        "$set": {
            "password_hash": hash_password(&body.password)?,
            "password_changed_at": bson::DateTime::now(),
        }
    };
    let user = state
        .db
        .users
        .find_one_and_update(doc! { "_id": caller.id }, update)
        .await?
        .ok_or_else(|| ScribeError::NotFound("User not found".into()))?;

    info!("Password changed for user {}", caller.id);
    ok_json(&UserView::from(&user))
}

/// PUT /api/users/follow
async fn handle_follow(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    let body: FollowRequest = parse_json_body(req).await?;
    require_fields(&[("followId", body.follow_id.as_str())])?;

    state
        .follows
        .set_follow_state(&caller.id_hex(), &body.follow_id, true)
        .await?;
    ok_json(&MessageResponse::new("You have successfully followed this user"))
}

/// PUT /api/users/unfollow
async fn handle_unfollow(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    let body: UnfollowRequest = parse_json_body(req).await?;
    require_fields(&[("unfollowId", body.unfollow_id.as_str())])?;

    state
        .follows
        .set_follow_state(&caller.id_hex(), &body.unfollow_id, false)
        .await?;
    ok_json(&MessageResponse::new("You have successfully unfollowed this user"))
}

/// PUT /api/users/block-user/{id} and /unblock-user/{id}
async fn handle_set_blocked(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
    blocked: bool,
) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    caller.require_admin()?;
    let oid = parse_object_id(id)?;

    let user = state
        .db
        .users
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": { "is_blocked": blocked } })
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("User {} not found", id)))?;

    info!(
        "User {} {} by {}",
        oid,
        if blocked { "blocked" } else { "unblocked" },
        caller.id
    );
    ok_json(&UserView::from(&user))
}

/// POST /api/users/generate-verify-email-token
async fn handle_generate_verify_token(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let caller = state.auth(req.headers()).await?;
    if caller.user.is_account_verified {
        return Err(ScribeError::AlreadyInState("Account is already verified".into()));
    }

    let issued = state.tokens.issue(&caller.id_hex(), TokenPurpose::Verify).await?;
    let mail = verification_mail(
        &issued.user.email,
        &state.args.client_url,
        &issued.plaintext,
        state.tokens.ttl(),
    );
    state.mailer.send(&state.args.mail_from, &mail).await?;

    ok_json(&MessageResponse::new(format!(
        "Verification email sent to {}",
        issued.user.email
    )))
}

/// POST /api/users/verify-user
async fn handle_verify(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let body: VerifyRequest = parse_json_body(req).await?;
    let user = state.tokens.consume(&body.token, Redemption::Verify).await?;
    ok_json(&UserView::from(&user))
}

/// POST /api/users/forget-password
async fn handle_forget_password(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let body: ForgetPasswordRequest = parse_json_body(req).await?;
    require_fields(&[("email", body.email.as_str())])?;

    let email = normalize_email(&body.email);
    let user = state
        .db
        .users
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| ScribeError::NotFound("User not found".into()))?;
    let id = user
        ._id
        .ok_or_else(|| ScribeError::Internal("Stored user has no id".into()))?;

    let issued = state.tokens.issue(&id.to_hex(), TokenPurpose::Reset).await?;
    let mail = reset_mail(
        &issued.user.email,
        &state.args.client_url,
        &issued.plaintext,
        state.tokens.ttl(),
    );
    state.mailer.send(&state.args.mail_from, &mail).await?;

    ok_json(&MessageResponse::new(format!(
        "A password reset link was sent to {}; it expires in {} minutes",
        issued.user.email,
        state.tokens.ttl().num_minutes()
    )))
}

/// PUT /api/users/reset-password
async fn handle_reset_password(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let body: ResetPasswordRequest = parse_json_body(req).await?;
    let user = state
        .tokens
        .consume(
            &body.token,
            Redemption::Reset {
                new_password: body.password,
            },
        )
        .await?;
    ok_json(&UserView::from(&user))
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle `/api/users/*` requests
pub async fn handle_user_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let Some(segments) = path_segments(&path, "/api/users") else {
        return not_found_response(&path);
    };

    let result = match (&method, segments.as_slice()) {
        (&Method::POST, ["register"]) => handle_register(req, &state).await,
        (&Method::POST, ["login"]) => handle_login(req, &state).await,
        (&Method::GET, []) => handle_list(req, &state).await,
        (&Method::PUT, ["profile"]) => handle_update_profile(req, &state).await,
        (&Method::GET, ["profile", id]) => handle_profile(req, &state, id).await,
        (&Method::PUT, ["password"]) => handle_update_password(req, &state).await,
        (&Method::PUT, ["follow"]) => handle_follow(req, &state).await,
        (&Method::PUT, ["unfollow"]) => handle_unfollow(req, &state).await,
        (&Method::PUT, ["block-user", id]) => handle_set_blocked(req, &state, id, true).await,
        (&Method::PUT, ["unblock-user", id]) => handle_set_blocked(req, &state, id, false).await,
        (&Method::POST, ["generate-verify-email-token"]) => {
            handle_generate_verify_token(req, &state).await
        }
        (&Method::POST, ["verify-user"]) => handle_verify(req, &state).await,
        (&Method::POST, ["forget-password"]) => handle_forget_password(req, &state).await,
        (&Method::PUT, ["reset-password"]) => handle_reset_password(req, &state).await,
        (&Method::GET, [id]) => handle_fetch(&state, id).await,
        (&Method::DELETE, [id]) => handle_delete(req, &state, id).await,

        (_, [])
        | (_, ["register" | "login" | "profile" | "password" | "follow" | "unfollow"])
        | (_, ["verify-user" | "forget-password" | "reset-password"])
        | (_, ["generate-verify-email-token"])
        | (_, [_]) => return method_not_allowed(),

        _ => return not_found_response(&path),
    };

    respond(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_request_accepts_both_names() {
        let a: FollowRequest = serde_json::from_str(r#"{"followId":"abc"}"#).unwrap();
        let b: FollowRequest = serde_json::from_str(r#"{"followedId":"abc"}"#).unwrap();
        assert_eq!(a.follow_id, "abc");
        assert_eq!(b.follow_id, "abc");
    }

    #[test]
    fn test_profile_update_skips_blank_fields() {
        let body: UpdateProfileRequest = serde_json::from_str(
            r#"{"firstName":"  Ada ","lastName":"","email":" ADA@Example.com ","bio":"hi"}"#,
        )
        .unwrap();
        let set = body.to_set();
        assert_eq!(set.get_str("first_name").unwrap(), "Ada");
        assert!(set.get("last_name").is_none());
        assert_eq!(set.get_str("email").unwrap(), "ada@example.com");
        assert_eq!(set.get_str("bio").unwrap(), "hi");

        assert!(UpdateProfileRequest::default().to_set().is_empty());
    }

    #[test]
    fn test_register_request_camel_case() {
        let body: RegisterRequest = serde_json::from_str(
            r#"{"firstName":"A","lastName":"B","email":"a@b.c","password":"longpassword"}"#,
        )
        .unwrap();
        assert_eq!(body.first_name, "A");
        assert_eq!(body.last_name, "B");
        assert!(require_fields(&[("firstName", body.first_name.as_str()), ("email", body.email.as_str())]).is_ok());
    }
}

//! HTTP routes for Scribe
//!
//! Each resource module exposes one `handle_*_request` entry point that the
//! server dispatches to by path prefix. Handlers return `RouteResult`; the
//! entry points turn errors into `{ error, code }` JSON bodies.

pub mod categories;
pub mod comments;
pub mod emails;
pub mod health;
pub mod posts;
pub mod users;
pub mod views;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE,
};
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, warn};

use crate::types::ScribeError;

pub use categories::handle_category_request;
pub use comments::handle_comment_request;
pub use emails::handle_email_request;
pub use health::health_check;
pub use posts::handle_post_request;
pub use users::handle_user_request;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

pub type RouteResult = Result<Response<BoxBody>, ScribeError>;

/// Largest JSON body accepted
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

fn with_cors(response: &mut Response<BoxBody>) {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    with_cors(&mut response);
    response
}

pub fn ok_json<T: Serialize>(body: &T) -> RouteResult {
    Ok(json_response(StatusCode::OK, body))
}

pub fn created_json<T: Serialize>(body: &T) -> RouteResult {
    Ok(json_response(StatusCode::CREATED, body))
}

pub fn error_response(err: &ScribeError) -> Response<BoxBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!("{}", err);
    } else {
        warn!("{}", err);
    }
    json_response(
        status,
        &ErrorResponse {
            error: err.to_string(),
            code: Some(err.code().into()),
        },
    )
}

/// Collapse a handler result into a response
pub fn respond(result: RouteResult) -> Response<BoxBody> {
    result.unwrap_or_else(|e| error_response(&e))
}

pub fn cors_preflight() -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    with_cors(&mut response);
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("Not found - {}", path),
            code: Some("NOT_FOUND".into()),
        },
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: None,
        },
    )
}

pub async fn parse_json_body<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T, ScribeError> {
    let body = req
        .collect()
        .await
        .map_err(|e| ScribeError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(ScribeError::Http("Request body too large".into()));
    }

    decode_json(&bytes)
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ScribeError> {
    serde_json::from_slice(bytes).map_err(|e| ScribeError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Decode a query string into `T`; an absent query decodes as empty
pub fn parse_query<T: DeserializeOwned + Default>(query: Option<&str>) -> Result<T, ScribeError> {
    match query {
        None | Some("") => Ok(T::default()),
        Some(q) => serde_urlencoded::from_str(q)
            .map_err(|e| ScribeError::BadRequest(format!("Invalid query: {}", e))),
    }
}

/// Path below `prefix`, split on `/` with empty segments dropped.
///
/// `None` when `path` is not under `prefix`.
pub fn path_segments<'a>(path: &'a str, prefix: &str) -> Option<Vec<&'a str>> {
    let rest = path.strip_prefix(prefix)?;
    if !(rest.is_empty() || rest.starts_with('/')) {
        return None;
    }
    Some(rest.split('/').filter(|s| !s.is_empty()).collect())
}

/// Reject blank required fields with one message naming all of them
pub fn require_fields(fields: &[(&str, &str)]) -> Result<(), ScribeError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ScribeError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// `{ "postId": ... }` style bodies
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdRequest {
    #[serde(default)]
    pub post_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("/api/posts", "/api/posts"), Some(vec![]));
        assert_eq!(path_segments("/api/posts/", "/api/posts"), Some(vec![]));
        assert_eq!(
            path_segments("/api/posts/abc/", "/api/posts"),
            Some(vec!["abc"])
        );
        assert_eq!(
            path_segments("/api/users/profile/abc", "/api/users"),
            Some(vec!["profile", "abc"])
        );
        assert_eq!(path_segments("/api/postsx", "/api/posts"), None);
        assert_eq!(path_segments("/health", "/api/posts"), None);
    }

    #[test]
    fn test_require_fields() {
        assert!(require_fields(&[("email", "a@b.c"), ("password", "x")]).is_ok());
        let err = require_fields(&[("email", " "), ("password", ""), ("name", "n")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad request: Missing required fields: email, password"
        );
    }

    #[derive(Debug, Default, Deserialize)]
    struct Filter {
        category: Option<String>,
    }

    #[test]
    fn test_parse_query() {
        let q: Filter = parse_query(None).unwrap();
        assert!(q.category.is_none());
        let q: Filter = parse_query(Some("category=Tech%20News")).unwrap();
        assert_eq!(q.category.as_deref(), Some("Tech News"));
    }

    #[test]
    fn test_decode_json() {
        let body: PostIdRequest = decode_json(br#"{"postId":"abc"}"#).unwrap();
        assert_eq!(body.post_id, "abc");
        assert!(decode_json::<PostIdRequest>(b"not json").is_err());
    }

    #[test]
    fn test_error_response_status() {
        let resp = error_response(&ScribeError::AlreadyInState("x".into()));
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = error_response(&ScribeError::TokenInvalidOrExpired);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(cors_preflight().status(), StatusCode::NO_CONTENT);
    }
}

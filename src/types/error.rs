//! Error types for Scribe
//!
//! Every failure the relationship engine, token workflow and route handlers
//! can produce. The HTTP layer turns these into a status code plus a
//! `{ error, code }` JSON body; storage errors are flattened to strings so
//! raw driver objects never reach a client.

use hyper::StatusCode;

/// Main error type for Scribe operations
#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Self reference: {0}")]
    SelfReference(String),

    #[error("Already in state: {0}")]
    AlreadyInState(String),

    #[error("Token is invalid or has expired")]
    TokenInvalidOrExpired,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Mail delivery error: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl ScribeError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::SelfReference(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyInState(_) => StatusCode::CONFLICT,
            Self::TokenInvalidOrExpired => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Mail(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InvalidIdentifier(_) => "INVALID_ID",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::SelfReference(_) => "SELF_REFERENCE",
            Self::AlreadyInState(_) => "ALREADY_IN_STATE",
            Self::TokenInvalidOrExpired => "TOKEN_INVALID",
            Self::Conflict(_) => "CONFLICT",
            Self::StoreUnavailable(_) => "DB_UNAVAILABLE",
            Self::Mail(_) => "MAIL_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Http(_) => "HTTP_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for ScribeError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ScribeError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for ScribeError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for ScribeError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<bson::oid::Error> for ScribeError {
    fn from(err: bson::oid::Error) -> Self {
        Self::InvalidIdentifier(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ScribeError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

impl From<reqwest::Error> for ScribeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Mail(err.to_string())
    }
}

/// Result type alias for Scribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_taxonomy_status_codes() {
        assert_eq!(
            ScribeError::InvalidIdentifier("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScribeError::NotFound("post".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ScribeError::AlreadyInState("following".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ScribeError::StoreUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ScribeError::TokenInvalidOrExpired.code(), "TOKEN_INVALID");
    }

    #[test]
    fn test_bad_object_id_maps_to_invalid_identifier() {
        let err: ScribeError = bson::oid::ObjectId::parse_str("nope").unwrap_err().into();
        assert!(matches!(err, ScribeError::InvalidIdentifier(_)));
        assert_eq!(err.code(), "INVALID_ID");
    }

    #[test]
    fn test_status_and_body() {
        let (status, body) = ScribeError::TokenInvalidOrExpired.into_status_code_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Token is invalid or has expired");
    }
}

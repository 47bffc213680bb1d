//! Request authentication
//!
//! Resolves the bearer token on a request to the live user record. The
//! record, not the token claims, decides admin rights and blocked status.

use bson::oid::ObjectId;
use hyper::HeaderMap;

use crate::auth::{extract_token_from_header, Claims, JwtValidator, PermissionLevel};
use crate::db::schemas::UserDoc;
use crate::db::store::EntityStore;
use crate::types::{parse_object_id, Result, ScribeError};

/// The caller of an authenticated request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: ObjectId,
    pub user: UserDoc,
    pub claims: Claims,
}

impl AuthUser {
    pub fn permission_level(&self) -> PermissionLevel {
        self.user.permission_level()
    }

    pub fn require_admin(&self) -> Result<()> {
        self.permission_level().require(PermissionLevel::Admin)
    }

    /// Blocked users may read but not create content
    pub fn ensure_not_blocked(&self) -> Result<()> {
        if self.user.is_blocked {
            return Err(ScribeError::Forbidden(format!(
                "Access denied, {} is blocked",
                self.user.first_name
            )));
        }
        Ok(())
    }

    /// Owners may change their own records; admins may change anyone's
    pub fn ensure_owner_or_admin(&self, owner: &ObjectId) -> Result<()> {
        if &self.id == owner || self.permission_level() >= PermissionLevel::Admin {
            Ok(())
        } else {
            Err(ScribeError::Forbidden(
                "You are not allowed to modify this resource".into(),
            ))
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.to_hex()
    }
}

/// Authenticate a request from its headers
pub async fn authenticate(
    headers: &HeaderMap,
    jwt: &JwtValidator,
    store: &dyn EntityStore,
) -> Result<AuthUser> {
    let header = headers
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = extract_token_from_header(header)
        .ok_or_else(|| ScribeError::Unauthorized("No token attached to the header".into()))?;

    let claims = jwt.verify_token(token)?;
    let id = parse_object_id(&claims.sub)
        .map_err(|_| ScribeError::Unauthorized("Invalid token subject".into()))?;

    let user = store
        .find_user(&id)
        .await?
        .ok_or_else(|| ScribeError::Unauthorized("Not authorized, user no longer exists".into()))?;

    Ok(AuthUser { id, user, claims })
}

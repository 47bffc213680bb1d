//! Account verification and password reset tokens
//!
//! A token is 32 random bytes, hex encoded, handed to the user once (by
//! mail). Only its SHA-256 digest and an expiry are stored on the user.
//! Redemption matches digest and unexpired slot and clears it in the same
//! conditional update, so each token works at most once.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{check_password_strength, hash_password};
use crate::db::schemas::UserDoc;
use crate::db::store::{EntityStore, StoredToken, TokenEffect, TokenPurpose};
use crate::types::{parse_object_id, Result, ScribeError};

/// Random bytes per token
pub const TOKEN_BYTES: usize = 32;

/// Default lifetime of an issued token
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Fresh random token, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest of a plaintext token
pub fn digest_token(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// A token just issued; `plaintext` must go to the user and nowhere else
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub plaintext: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDoc,
}

/// How a token is being redeemed
#[derive(Debug, Clone)]
pub enum Redemption {
    Verify,
    Reset { new_password: String },
}

impl Redemption {
    pub fn purpose(&self) -> TokenPurpose {
        match self {
            Redemption::Verify => TokenPurpose::Verify,
            Redemption::Reset { .. } => TokenPurpose::Reset,
        }
    }
}

#[derive(Clone)]
pub struct TokenWorkflow {
    store: Arc<dyn EntityStore>,
    ttl: Duration,
}

impl TokenWorkflow {
    pub fn new(store: Arc<dyn EntityStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token of `purpose` for `actor_id`, replacing any earlier one
    pub async fn issue(&self, actor_id: &str, purpose: TokenPurpose) -> Result<IssuedToken> {
        self.issue_at(actor_id, purpose, Utc::now()).await
    }

    /// [`issue`](Self::issue) with an explicit clock reading
    pub async fn issue_at(
        &self,
        actor_id: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let actor = parse_object_id(actor_id)?;

        let plaintext = generate_token();
        let stored = StoredToken {
            digest: digest_token(&plaintext),
            expires_at: now + self.ttl,
        };

        let user = self
            .store
            .store_token(&actor, purpose, &stored)
            .await?
            .ok_or_else(|| ScribeError::NotFound(format!("User {} not found", actor_id)))?;

        info!(
            "Issued {} token for user {} (expires {})",
            purpose.as_str(),
            actor,
            stored.expires_at
        );

        Ok(IssuedToken {
            plaintext,
            expires_at: stored.expires_at,
            user,
        })
    }

    /// Redeem `plaintext`, returning the updated user
    pub async fn consume(&self, plaintext: &str, redemption: Redemption) -> Result<UserDoc> {
        self.consume_at(plaintext, redemption, Utc::now()).await
    }

    /// [`consume`](Self::consume) with an explicit clock reading
    pub async fn consume_at(
        &self,
        plaintext: &str,
        redemption: Redemption,
        now: DateTime<Utc>,
    ) -> Result<UserDoc> {
        let plaintext = plaintext.trim();
        if plaintext.is_empty() {
            return Err(ScribeError::TokenInvalidOrExpired);
        }

        let purpose = redemption.purpose();
        let effect = match redemption {
            Redemption::Verify => TokenEffect::MarkVerified,
            Redemption::Reset { new_password } => {
                check_password_strength(&new_password)?;
                TokenEffect::ReplaceCredential {
                    password_hash: hash_password(&new_password)?,
                }
            }
        };

        match self
            .store
            .redeem_token(&digest_token(plaintext), now, &effect)
            .await?
        {
            Some(user) => {
                info!(
                    "Redeemed {} token for user {:?}",
                    purpose.as_str(),
                    user._id
                );
                Ok(user)
            }
            None => {
                warn!("Rejected {} token: invalid or expired", purpose.as_str());
                Err(ScribeError::TokenInvalidOrExpired)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::db::MemoryStore;
    use bson::oid::ObjectId;

    fn setup() -> (Arc<MemoryStore>, TokenWorkflow, ObjectId) {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert_user(UserDoc::new(
            "Test".into(),
            "User".into(),
            "t@example.com".into(),
            hash_password("original-password").unwrap(),
        ));
        let workflow = TokenWorkflow::new(store.clone(), Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES));
        (store, workflow, id)
    }

    #[test]
    fn test_generate_token_shape() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        assert_eq!(
            digest_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_verify_consumes_once() {
        let (store, workflow, id) = setup();

        let issued = workflow.issue(&id.to_hex(), TokenPurpose::Verify).await.unwrap();
        let stored = store.user(&id).unwrap();
        assert_eq!(
            stored.account_verification_token.as_deref(),
            Some(digest_token(&issued.plaintext).as_str())
        );
        assert!(!stored.is_account_verified);

        let user = workflow.consume(&issued.plaintext, Redemption::Verify).await.unwrap();
        assert!(user.is_account_verified);
        assert!(user.account_verification_token.is_none());
        assert!(user.account_verification_token_expires.is_none());

        let err = workflow
            .consume(&issued.plaintext, Redemption::Verify)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::TokenInvalidOrExpired));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (store, workflow, id) = setup();
        let issued_at = Utc::now() - Duration::minutes(31);
        let issued = workflow
            .issue_at(&id.to_hex(), TokenPurpose::Verify, issued_at)
            .await
            .unwrap();

        let err = workflow
            .consume(&issued.plaintext, Redemption::Verify)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::TokenInvalidOrExpired));
        assert!(!store.user(&id).unwrap().is_account_verified);
    }

    #[tokio::test]
    async fn test_expiry_is_strict() {
        let (_store, workflow, id) = setup();
        let issued_at = Utc::now();
        let issued = workflow
            .issue_at(&id.to_hex(), TokenPurpose::Verify, issued_at)
            .await
            .unwrap();

        let err = workflow
            .consume_at(&issued.plaintext, Redemption::Verify, issued.expires_at)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::TokenInvalidOrExpired));
    }

    #[tokio::test]
    async fn test_reset_scenario() {
        let (store, workflow, id) = setup();
        let before = Utc::now();
        let issued = workflow.issue(&id.to_hex(), TokenPurpose::Reset).await.unwrap();

        let stored = store.user(&id).unwrap();
        assert_eq!(
            stored.password_reset_token.as_deref(),
            Some(digest_token(&issued.plaintext).as_str())
        );
        let expiry = stored.password_reset_expires.unwrap().to_chrono();
        assert!(expiry >= before + Duration::minutes(30) - Duration::seconds(1));
        assert!(expiry <= Utc::now() + Duration::minutes(30));

        let user = workflow
            .consume(
                &issued.plaintext,
                Redemption::Reset {
                    new_password: "brand-new-password".into(),
                },
            )
            .await
            .unwrap();
        assert!(user.password_reset_token.is_none());
        assert!(user.password_reset_expires.is_none());
        assert!(user.password_changed_at.is_some());
        assert!(verify_password("brand-new-password", &user.password_hash).unwrap());
        assert!(!verify_password("original-password", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_new_token_overwrites_old() {
        let (_store, workflow, id) = setup();
        let first = workflow.issue(&id.to_hex(), TokenPurpose::Reset).await.unwrap();
        let second = workflow.issue(&id.to_hex(), TokenPurpose::Reset).await.unwrap();

        let reset = || Redemption::Reset {
            new_password: "another-password".into(),
        };
        let err = workflow.consume(&first.plaintext, reset()).await.unwrap_err();
        assert!(matches!(err, ScribeError::TokenInvalidOrExpired));
        assert!(workflow.consume(&second.plaintext, reset()).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_purpose_and_tampering() {
        let (_store, workflow, id) = setup();
        let issued = workflow.issue(&id.to_hex(), TokenPurpose::Verify).await.unwrap();

        let err = workflow
            .consume(
                &issued.plaintext,
                Redemption::Reset {
                    new_password: "whatever-password".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::TokenInvalidOrExpired));

        let mut tampered = issued.plaintext.clone();
        tampered.replace_range(0..1, if tampered.starts_with('a') { "b" } else { "a" });
        let err = workflow.consume(&tampered, Redemption::Verify).await.unwrap_err();
        assert!(matches!(err, ScribeError::TokenInvalidOrExpired));

        let err = workflow.consume("", Redemption::Verify).await.unwrap_err();
        assert!(matches!(err, ScribeError::TokenInvalidOrExpired));
    }

    #[tokio::test]
    async fn test_weak_reset_password_rejected_without_consuming() {
        let (_store, workflow, id) = setup();
        let issued = workflow.issue(&id.to_hex(), TokenPurpose::Reset).await.unwrap();

        let err = workflow
            .consume(
                &issued.plaintext,
                Redemption::Reset {
                    new_password: "short".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::BadRequest(_)));

        let ok = workflow
            .consume(
                &issued.plaintext,
                Redemption::Reset {
                    new_password: "long-enough-now".into(),
                },
            )
            .await;
        tokio_test::assert_ok!(ok);
    }

    #[tokio::test]
    async fn test_issue_for_unknown_user() {
        let (_store, workflow, _) = setup();
        let err = workflow
            .issue(&ObjectId::new().to_hex(), TokenPurpose::Verify)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_failure_on_consume_is_returned() {
        let (store, workflow, id) = setup();
        let issued = workflow.issue(&id.to_hex(), TokenPurpose::Verify).await.unwrap();
        store.fail_writes_after(0);

        let err = workflow
            .consume(&issued.plaintext, Redemption::Verify)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::StoreUnavailable(_)));

        let stored = store.user(&id).unwrap();
        assert!(!stored.is_account_verified);
        assert!(stored.account_verification_token.is_some());
    }
}

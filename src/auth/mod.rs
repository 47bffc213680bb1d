//! Authentication and authorization for Scribe
//!
//! Provides:
//! - JWT session token generation and validation
//! - Bearer token resolution to the live user record
//! - Permission levels for admin-only operations
//! - Password hashing with Argon2

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput};
pub use middleware::{authenticate, AuthUser};
pub use password::{check_password_strength, hash_password, verify_password, MIN_PASSWORD_LEN};
pub use permissions::PermissionLevel;

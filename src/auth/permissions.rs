//! Permission levels carried in session tokens

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ScribeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum PermissionLevel {
    /// Any logged-in user
    #[default]
    Authenticated = 1,
    /// May block users and moderate other people's content
    Admin = 2,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Authenticated => write!(f, "AUTHENTICATED"),
            PermissionLevel::Admin => write!(f, "ADMIN"),
        }
    }
}

impl PermissionLevel {
    /// Fail with `Forbidden` unless this level reaches `required`
    pub fn require(self, required: PermissionLevel) -> Result<(), ScribeError> {
        if self >= required {
            Ok(())
        } else {
            Err(ScribeError::Forbidden(format!(
                "{} permission required",
                required
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(PermissionLevel::Admin > PermissionLevel::Authenticated);
    }

    #[test]
    fn test_require() {
        assert!(PermissionLevel::Admin.require(PermissionLevel::Authenticated).is_ok());
        assert!(PermissionLevel::Admin.require(PermissionLevel::Admin).is_ok());
        let err = PermissionLevel::Authenticated
            .require(PermissionLevel::Admin)
            .unwrap_err();
        assert!(matches!(err, ScribeError::Forbidden(_)));
    }

    #[test]
    fn test_serde_uppercase() {
        let json = serde_json::to_string(&PermissionLevel::Admin).unwrap();
        assert_eq!(json, "\"ADMIN\"");
    }
}

//! Identifier validation
//!
//! Every caller-supplied id is checked here before it reaches the store.

use bson::oid::ObjectId;

use super::ScribeError;

/// Parse a caller-supplied 24 character hex id, failing with
/// `InvalidIdentifier`. Surrounding whitespace is ignored.
pub fn parse_object_id(id: &str) -> Result<ObjectId, ScribeError> {
    ObjectId::parse_str(id.trim())
        .map_err(|_| ScribeError::InvalidIdentifier(format!("'{}' is not a valid id", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_hex() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex()).unwrap(), id);
        assert_eq!(parse_object_id(&format!(" {} ", id.to_hex())).unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["not-an-id", "123", "", "zzzzzzzzzzzzzzzzzzzzzzzz"] {
            let err = parse_object_id(bad).unwrap_err();
            assert!(matches!(err, ScribeError::InvalidIdentifier(_)));
        }
    }
}

//! Database utility functions.

use chrono::{SecondsFormat, Utc};

use crate::db::{DbError, DbResult};

/// Generate a 32-character hex ID for database entities
pub fn generate_entity_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Reject anything that is not a 32-character hex ID
pub fn validate_entity_id(id: &str) -> DbResult<()> {
    if id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(DbError::Validation {
            message: format!("'{}' is not a valid id (expected 32 hex characters)", id),
        })
    }
}

/// Get current datetime as an ISO 8601 UTC string with milliseconds
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_validate() {
        let id = generate_entity_id();
        assert_eq!(id.len(), 32);
        assert!(validate_entity_id(&id).is_ok());
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(generate_entity_id(), generate_entity_id());
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(validate_entity_id("").is_err());
        assert!(validate_entity_id("not-an-id").is_err());
        assert!(validate_entity_id(&"g".repeat(32)).is_err());
        assert!(validate_entity_id(&"a".repeat(24)).is_err());
    }

    #[test]
    fn timestamp_is_iso8601_utc() {
        let ts = current_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}

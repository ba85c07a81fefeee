//! JSON envelope shared by every endpoint.

use serde::{Deserialize, Serialize};

fn default_success() -> bool {
    true
}

/// `{success, data?, error?}` wrapper around every response body.
///
/// A body without `success` reads as successful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload, serialized as `{"success": true}`.
    pub fn success() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_success_reads_as_success() {
        let parsed: ApiResponse<Vec<String>> = serde_json::from_str("{}").unwrap();
        assert!(parsed.success);
        assert!(parsed.data.is_none());
        assert!(parsed.error.is_none());
    }

    #[test]
    fn explicit_failure_is_kept() {
        let parsed: ApiResponse<Vec<String>> =
            serde_json::from_str(r#"{"success": false, "error": "nope"}"#).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.error.as_deref(), Some("nope"));
    }
}

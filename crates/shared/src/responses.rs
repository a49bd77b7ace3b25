//! Response types for delegated queries

use serde::{Deserialize, Serialize};
use spellbook_domain::ErrorKind;

// =============================================================================
// Response Result
// =============================================================================

/// Result of a delegated query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseResult {
    /// Operation succeeded
    Success {
        /// Optional data payload (varies by query type)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    /// Operation failed
    Error {
        /// Error classification code
        code: ErrorCode,
        /// Human-readable error message
        message: String,
    },
    /// Unknown response type for forward compatibility
    #[serde(other)]
    Unknown,
}

impl ResponseResult {
    /// Create a success response with data
    pub fn success<T: Serialize>(data: T) -> Self {
        ResponseResult::Success {
            data: Some(serde_json::to_value(data).unwrap_or_default()),
        }
    }

    /// Create a success response without data
    pub fn success_empty() -> Self {
        ResponseResult::Success { data: None }
    }

    /// Create an error response
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ResponseResult::Error {
            code,
            message: message.into(),
        }
    }

    /// Check if this is a success response
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseResult::Success { .. })
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, ResponseResult::Error { .. })
    }
}

// =============================================================================
// Error Codes
// =============================================================================

/// Error classification codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Request was malformed or failed validation
    Invalid,
    /// Requester lacks permission for this operation
    Forbidden,
    /// Referenced document not found
    NotFound,
    /// Stored data is malformed
    Corrupted,
    /// Internal error on the answering side
    InternalError,
    /// The answering side could not complete the operation in time
    ServiceUnavailable,

    /// Unknown variant for forward compatibility
    #[serde(other)]
    Unknown,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::Invalid => ErrorCode::Invalid,
            ErrorKind::PermissionDenied => ErrorCode::Forbidden,
            ErrorKind::Unavailable => ErrorCode::ServiceUnavailable,
            ErrorKind::Corruption => ErrorCode::Corrupted,
            ErrorKind::Internal => ErrorCode::InternalError,
        }
    }
}

impl From<ErrorCode> for ErrorKind {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::NotFound => ErrorKind::NotFound,
            ErrorCode::Invalid => ErrorKind::Invalid,
            ErrorCode::Forbidden => ErrorKind::PermissionDenied,
            ErrorCode::ServiceUnavailable => ErrorKind::Unavailable,
            ErrorCode::Corrupted => ErrorKind::Corruption,
            ErrorCode::InternalError | ErrorCode::Unknown => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_round_trip_through_kinds() {
        for kind in [
            ErrorKind::NotFound,
            ErrorKind::Invalid,
            ErrorKind::PermissionDenied,
            ErrorKind::Unavailable,
            ErrorKind::Corruption,
            ErrorKind::Internal,
        ] {
            assert_eq!(ErrorKind::from(ErrorCode::from(kind)), kind);
        }
    }

    #[test]
    fn unknown_status_is_tolerated() {
        let result: ResponseResult = serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
        assert_eq!(result, ResponseResult::Unknown);
    }

    #[test]
    fn error_wire_shape() {
        let value =
            serde_json::to_value(ResponseResult::error(ErrorCode::Invalid, "bad name")).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], "invalid");
    }
}

// Admin API payloads

use serde::{Deserialize, Serialize};

pub use crate::gate::AppStatusRecord as AppStatusResponse;

/// Body returned when an admin operation fails
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AppStatus;

    #[test]
    fn test_status_response_serialization() {
        let response = AppStatusResponse::new(AppStatus::Stopped);
        let serialized = serde_json::to_string(&response).unwrap();
        assert_eq!(serialized, r#"{"status":"stopped"}"#);
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("key-value store error: connection refused");
        let value: serde_json::Value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"], "key-value store error: connection refused");
    }
}

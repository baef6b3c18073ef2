use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Status code of an accepted delivery
pub const SUCCESS_CODE: i32 = 200;

/// Generic failure code for providers that don't report their own
pub const FAIL_CODE: i32 = -1;

/// Result of a single send attempt for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    /// Provider payload, opaque to the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl DispatchOutcome {
    pub fn success(data: Option<serde_json::Value>) -> Self {
        Self {
            code: SUCCESS_CODE,
            msg: "ok".to_string(),
            data,
        }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self::with_code(FAIL_CODE, msg)
    }

    pub fn with_code(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Error describing a non-success outcome
    pub fn to_error(&self) -> AppError {
        AppError::provider_status(self.code, self.msg.clone())
    }
}

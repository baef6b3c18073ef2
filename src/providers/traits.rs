use std::sync::Arc;

use super::request::SendRequest;
use crate::dispatch::{DispatchOutcome, TokenSender};
use crate::errors::{AppError, AppResult};
use crate::stats::Platform;

/// Contract every vendor integration fulfils to be driven by the dispatcher
pub trait PushProvider: Send + Sync {
    /// Platform served; also the counter-key prefix owner
    fn platform(&self) -> Platform;

    /// Registry name
    fn name(&self) -> &str {
        self.platform().as_str()
    }

    /// Reject a request before anything is sent
    fn check_notification(&self, request: &SendRequest) -> AppResult<()> {
        validate_request(request)
    }

    /// Build the vendor payload once and return a per-token sender over it
    fn prepare(&self, request: &SendRequest) -> AppResult<Arc<dyn TokenSender>>;

    /// Task id carried by a successful outcome, if any
    fn task_id(&self, outcome: &DispatchOutcome) -> Option<String> {
        let value = outcome.data.as_ref()?.get("task_id")?;
        match value {
            serde_json::Value::String(id) => Some(id.clone()),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Minimum every provider requires: tokens, title and content present
pub fn validate_request(request: &SendRequest) -> AppResult<()> {
    if request.tokens.is_empty() {
        return Err(AppError::validation("tokens", "at least one token is required"));
    }
    if let Some(index) = request.tokens.iter().position(|t| t.trim().is_empty()) {
        return Err(AppError::validation(
            "tokens",
            format!("token at index {index} is empty"),
        ));
    }
    if request.title.trim().is_empty() {
        return Err(AppError::validation("title", "must not be empty"));
    }
    if request.content.trim().is_empty() {
        return Err(AppError::validation("content", "must not be empty"));
    }
    if matches!(&request.app_id, Some(id) if id.trim().is_empty()) {
        return Err(AppError::validation("app_id", "must not be blank when given"));
    }
    Ok(())
}

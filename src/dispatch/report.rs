use serde::Serialize;

use super::outcome::DispatchOutcome;
use crate::errors::{AppError, AppResult};
use crate::stats::Platform;

/// Terminal result for one token
#[derive(Debug, Clone, Serialize)]
pub struct TokenReport {
    pub token: String,
    pub attempts: u32,
    /// Successful outcome, absent when every attempt failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DispatchOutcome>,
    /// One message per failed attempt, in attempt order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl TokenReport {
    pub fn delivered(token: String, attempts: u32, outcome: DispatchOutcome, errors: Vec<String>) -> Self {
        Self {
            token,
            attempts,
            outcome: Some(outcome),
            errors,
        }
    }

    pub fn failed(token: String, attempts: u32, errors: Vec<String>) -> Self {
        Self {
            token,
            attempts,
            outcome: None,
            errors,
        }
    }

    /// Report for a token whose task never returned
    pub fn aborted(token: &str, reason: impl Into<String>) -> Self {
        Self::failed(token.to_string(), 0, vec![reason.into()])
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Merged result of one dispatch, tokens kept in request order
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub platform: Platform,
    pub tokens: Vec<TokenReport>,
}

impl DispatchReport {
    pub fn new(platform: Platform, tokens: Vec<TokenReport>) -> Self {
        Self { platform, tokens }
    }

    pub fn total(&self) -> usize {
        self.tokens.len()
    }

    pub fn success_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.succeeded()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.total() - self.success_count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn is_partial(&self) -> bool {
        self.success_count() > 0 && self.failure_count() > 0
    }

    /// Representative outcome: the first success in token order
    pub fn first_success(&self) -> Option<&DispatchOutcome> {
        self.tokens.iter().find_map(|t| t.outcome.as_ref())
    }

    /// Distinct error messages of tokens that never succeeded, first occurrence first
    pub fn unique_errors(&self) -> Vec<String> {
        let mut unique: Vec<String> = Vec::new();
        for report in self.tokens.iter().filter(|t| !t.succeeded()) {
            for error in &report.errors {
                if !unique.iter().any(|seen| seen == error) {
                    unique.push(error.clone());
                }
            }
        }
        unique
    }

    pub fn aggregate_error(&self) -> Option<AppError> {
        if self.is_success() {
            return None;
        }

        Some(AppError::Dispatch {
            message: self.unique_errors().join(", "),
            failed: self.failure_count(),
            total: self.total(),
        })
    }

    /// Collapse into the representative outcome or the aggregate error
    pub fn into_result(self) -> AppResult<DispatchOutcome> {
        if let Some(err) = self.aggregate_error() {
            return Err(err);
        }

        Ok(self
            .first_success()
            .cloned()
            .unwrap_or_else(|| DispatchOutcome::success(None)))
    }
}

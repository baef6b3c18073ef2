//! Centralized error handling module
//!
//! Library code returns [`AppResult`]; the binary layer wraps it in `anyhow`.

pub mod types;

pub use types::{AppError, AppResult};

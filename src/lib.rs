//! Push Gateway Library
//!
//! Fans one notification out to many device tokens through vendor provider
//! adapters, retries each token independently, and keeps per-platform
//! outcome counters in a pluggable store.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod gateway;
pub mod providers;
pub mod stats;
pub mod store;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigManager};
pub use dispatch::{DispatchOutcome, DispatchReport, Dispatcher, RetryPolicy, TokenSender};
pub use errors::{AppError, AppResult};
pub use gateway::{Delivery, Gateway};
pub use providers::{PushProvider, SendOptions, SendRequest, SendResponse};
pub use stats::{Metric, Platform, Stats};
pub use store::{open_store, CounterStore};

//! Provider adapters
//!
//! A [`PushProvider`] validates a request and turns it into a
//! [`TokenSender`](crate::dispatch::TokenSender) for the dispatcher. Adapters
//! never touch counters; the dispatcher records them.

mod factory;
mod registry;
mod relay;
mod request;
mod traits;

pub use factory::{DefaultProviderFactory, ProviderFactory};
pub use registry::ProviderRegistry;
pub use relay::{RelayProvider, DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use request::{SendOptions, SendRequest, SendResponse};
pub use traits::{validate_request, PushProvider};

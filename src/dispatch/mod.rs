//! Dispatch/retry engine
//!
//! Drives a [`TokenSender`] over every token of a request:
//!
//! - bounded fan-out (counting semaphore, default 100 in flight)
//! - independent retry per token, first retry immediate by default
//! - single-threaded merge of per-token results after all tasks finish
//! - one `total` and one `success`/`failed` increment per token

mod engine;
mod outcome;
mod report;
mod retry;

pub use engine::{sender_fn, Dispatcher, FnSender, TokenSender};
pub use outcome::{DispatchOutcome, FAIL_CODE, SUCCESS_CODE};
pub use report::{DispatchReport, TokenReport};
pub use retry::RetryPolicy;

//! Row-level retry with linear backoff and forced session refresh.
//!
//! Retries happen per row, never per file: the executor does not retry on
//! its own. A failed attempt is followed by a wait of `k * delay`; the wait
//! before the last attempt also re-logs in.

mod error;
mod policy;
mod run;

pub use error::SessionLost;
pub use policy::{RetryDecision, RowRetryPolicy};
pub use run::{run_row, Attempt, RowOutcome};

//! Row retry loop: run attempts until success, a terminal result, or the
//! policy says stop.

use crate::control::CancelToken;

use super::error::SessionLost;
use super::policy::{RetryDecision, RowRetryPolicy};

/// Result of one attempt at a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Done(T),
    /// Retryable failure.
    Failed(String),
    /// The session expired; refresh and try again.
    AuthRequired,
    /// Not retried (e.g. the page lists no documents).
    Terminal(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Failed { reason: String, attempts: u32 },
    Cancelled,
}

/// Drive `attempt_fn` under `policy`. `refresh` re-logs in and returns
/// whether that worked; a failed refresh is `Err(SessionLost)`.
/// Auth-required signals refresh immediately without using up an attempt,
/// until more than `max_auth_refreshes` of them have been seen.
pub fn run_row<T, A, R>(
    policy: &RowRetryPolicy,
    cancel: &CancelToken,
    mut refresh: R,
    mut attempt_fn: A,
) -> Result<RowOutcome<T>, SessionLost>
where
    A: FnMut(u32) -> Attempt<T>,
    R: FnMut() -> bool,
{
    let mut attempt = 1u32;
    let mut auth_signals = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Ok(RowOutcome::Cancelled);
        }

        let reason = match attempt_fn(attempt) {
            Attempt::Done(value) => {
                return Ok(RowOutcome::Succeeded {
                    value,
                    attempts: attempt,
                })
            }
            Attempt::Terminal(reason) => {
                return Ok(RowOutcome::Failed {
                    reason,
                    attempts: attempt,
                })
            }
            Attempt::Cancelled => return Ok(RowOutcome::Cancelled),
            Attempt::AuthRequired => {
                auth_signals += 1;
                if auth_signals <= policy.max_auth_refreshes {
                    tracing::info!(attempt, "authentication required, refreshing session");
                    if !refresh() {
                        return Err(SessionLost);
                    }
                    continue;
                }
                "authentication required".to_string()
            }
            Attempt::Failed(reason) => reason,
        };

        match policy.decide(attempt) {
            RetryDecision::GiveUp => {
                return Ok(RowOutcome::Failed {
                    reason,
                    attempts: attempt,
                })
            }
            RetryDecision::RetryAfter {
                delay,
                refresh_session,
            } => {
                tracing::warn!(attempt, ?delay, "attempt failed: {}; retrying", reason);
                if cancel.wait(delay) {
                    return Ok(RowOutcome::Cancelled);
                }
                if refresh_session {
                    tracing::info!(attempt, "refreshing session before last attempt");
                    if !refresh() {
                        return Err(SessionLost);
                    }
                }
                attempt += 1;
            }
        }
    }
}

/// A forced session refresh failed. Every later row would fail the same
/// way, so the whole chunk stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("session refresh failed")]
pub struct SessionLost;

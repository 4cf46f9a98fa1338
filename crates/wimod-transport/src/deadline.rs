use std::time::{Duration, Instant};

/// The point in time an operation has to finish by.
///
/// Timeouts too large to be represented as an [`Instant`] never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// A deadline that never passes.
    pub fn never() -> Self {
        Self { at: None }
    }

    /// Time left, zero once passed and [`Duration::MAX`] if unbounded.
    pub fn remaining(&self) -> Duration {
        match self.at {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}

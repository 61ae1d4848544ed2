//! Profile id generation.
//!
//! Ids are minted from the wall clock in milliseconds, but a generator never
//! hands out the same value twice, even for creates within one clock tick.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Source of fresh profile ids.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Return an id this generator has never returned before.
    fn next_id(&self) -> i64;

    /// Record that `id` is already taken, so later ids are greater than it.
    fn observe(&self, id: i64);
}

/// Which id generator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Millisecond timestamps, bumped forward on collision.
    #[default]
    Clock,
    /// 1, 2, 3, ...
    Sequential,
}

impl IdStrategy {
    /// Build the generator for this strategy.
    #[must_use]
    pub fn generator(self) -> Arc<dyn IdGenerator> {
        match self {
            Self::Clock => Arc::new(ClockIdGenerator::new()),
            Self::Sequential => Arc::new(SequentialIdGenerator::new()),
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clock => write!(f, "clock"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

/// Timestamp ids that are strictly increasing.
///
/// Each call returns `max(now_ms, last + 1)`.
#[derive(Debug, Default)]
pub struct ClockIdGenerator {
    last: AtomicI64,
}

impl ClockIdGenerator {
    /// Create a generator with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for ClockIdGenerator {
    fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    fn observe(&self, id: i64) {
        self.last.fetch_max(id, Ordering::SeqCst);
    }
}

/// Counter ids starting at a fixed value.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicI64,
}

impl SequentialIdGenerator {
    /// Start counting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start counting at `first`.
    #[must_use]
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    fn observe(&self, id: i64) {
        self.next.fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }
}

//! crates/school_ops_core/src/context.rs
//!
//! Explicit per-console context handed to the controllers at construction time,
//! in place of any ambient session or global state.

use std::sync::Arc;

/// Source of creation timestamps.
pub trait Clock: Send + Sync {
    /// Epoch milliseconds.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Clone)]
pub struct ConsoleContext {
    /// Who is driving this console; recorded in the audit log lines.
    pub operator: String,
    pub clock: Arc<dyn Clock>,
}

impl ConsoleContext {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for ConsoleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleContext")
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

//! Request lifecycle tracking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Named timing marks for one request.
#[derive(Debug, Clone, Default)]
pub struct TimingContext {
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create an empty timing context.
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Mark the start of a store call.
    pub fn mark_store_start(&mut self, op: &str) {
        self.mark(&format!("store_{}_start", op));
    }

    /// Mark the end of a store call.
    pub fn mark_store_done(&mut self, op: &str) {
        self.mark(&format!("store_{}_done", op));
    }

    /// Duration of a store call, if both ends were marked.
    pub fn store_timing(&self, op: &str) -> Option<Duration> {
        let start = self.marks.get(&format!("store_{}_start", op))?;
        let done = self.marks.get(&format!("store_{}_done", op))?;
        Some(done.duration_since(*start))
    }
}

use tracing::info;

/// Work counters accumulated over one planner invocation.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Space-time A* nodes expanded, summed over every low-level call.
    pub low_level_expansions: usize,
    /// Largest open-list size seen by any low-level call.
    pub peak_open_size: usize,
    /// Constraint-tree nodes popped (CBS only).
    pub high_level_expansions: usize,
    pub time_ms: f64,
}

impl Stats {
    pub fn explored(&self) -> usize {
        self.low_level_expansions + self.high_level_expansions
    }

    pub fn log(&self, solver: &str) {
        info!(
            "{} finished: time {:.3}ms, high-level expansions {}, low-level expansions {}, peak open {}",
            solver, self.time_ms, self.high_level_expansions, self.low_level_expansions, self.peak_open_size
        );
    }
}

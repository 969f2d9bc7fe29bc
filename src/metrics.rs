//! Cycle accounting and the snapshot handed to report consumers

use std::fmt;

/// Cycle cost of each kind of operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CostModel {
    /// Main memory access (miss penalty and flushes)
    pub memory_access_cycles: u64,
    /// Cache hit
    pub cache_access_cycles: u64,
    /// One bus transaction, however many peers it touches
    pub bus_cycles: u64,
    /// Compute work charged for every instruction
    pub compute_cost: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            memory_access_cycles: 100,
            cache_access_cycles: 1,
            bus_cycles: 2,
            compute_cost: 1,
        }
    }
}

/// Counters accumulated while instructions execute.
/// They only ever grow.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Metrics {
    pub total_cycles: u64,
    pub compute_cycles: u64,
    pub load_instructions: u64,
    pub store_instructions: u64,
    pub cache_misses: u64,
    pub total_instructions: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idle_cycles(&self) -> u64 {
        self.total_cycles - self.compute_cycles
    }

    pub fn miss_rate(&self) -> f64 {
        if self.total_instructions == 0 {
            return 0.0;
        }
        self.cache_misses as f64 / self.total_instructions as f64
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_cycles: self.total_cycles,
            compute_cycles: self.compute_cycles,
            idle_cycles: self.idle_cycles(),
            load_instructions: self.load_instructions,
            store_instructions: self.store_instructions,
            cache_misses: self.cache_misses,
            total_instructions: self.total_instructions,
            miss_rate: self.miss_rate(),
        }
    }
}

/// Read-only copy of the metrics with the derived fields filled in
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct MetricsSnapshot {
    pub total_cycles: u64,
    pub compute_cycles: u64,
    pub idle_cycles: u64,
    pub load_instructions: u64,
    pub store_instructions: u64,
    pub cache_misses: u64,
    pub total_instructions: u64,
    pub miss_rate: f64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final performance metrics")?;
        writeln!(f, "{}", "=".repeat(30))?;
        writeln!(f, "Total cycles:       {}", self.total_cycles)?;
        writeln!(f, "Compute cycles:     {}", self.compute_cycles)?;
        writeln!(f, "Idle cycles:        {}", self.idle_cycles)?;
        writeln!(f, "Load instructions:  {}", self.load_instructions)?;
        writeln!(f, "Store instructions: {}", self.store_instructions)?;
        writeln!(f, "Total instructions: {}", self.total_instructions)?;
        writeln!(f, "Cache misses:       {}", self.cache_misses)?;
        write!(f, "Cache miss rate:    {:.2}%", self.miss_rate * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.miss_rate, 0.0);
    }

    #[test]
    fn test_derived_fields() {
        let metrics = Metrics {
            total_cycles: 310,
            compute_cycles: 4,
            load_instructions: 1,
            store_instructions: 3,
            cache_misses: 3,
            total_instructions: 4,
        };
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.idle_cycles, 306);
        assert!((snapshot.miss_rate - 0.75).abs() < 1e-9);
        // Taking a snapshot does not disturb the counters
        assert_eq!(metrics.snapshot(), snapshot);
    }

    #[test]
    fn test_report_format() {
        let metrics = Metrics {
            total_cycles: 10,
            compute_cycles: 2,
            load_instructions: 1,
            store_instructions: 1,
            cache_misses: 1,
            total_instructions: 2,
        };
        let report = metrics.snapshot().to_string();
        assert!(report.contains("Idle cycles:        8"));
        assert!(report.ends_with("50.00%"));
    }
}

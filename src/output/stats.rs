//! Per-phase run statistics
//!
//! Counters are updated concurrently by workers while a phase runs and
//! snapshotted into a `PhaseSummary` at the end.

use crate::model::Phase;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters for a running phase
#[derive(Debug, Default)]
pub struct PhaseCounters {
    processed: AtomicU64,
    succeeded: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
}

impl PhaseCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one item that produced output after `attempts` attempts
    pub fn record_success(&self, attempts: u32) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        if attempts > 1 {
            self.retried.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records one item that ended in the failure ledger
    pub fn record_failure(&self, attempts: u32) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
        if attempts > 1 {
            self.retried.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, phase: Phase, elapsed: Duration) -> PhaseSummary {
        PhaseSummary {
            phase,
            processed: self.processed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            elapsed,
            completeness: None,
            category_counts: BTreeMap::new(),
        }
    }
}

/// Summary of a finished phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
    pub phase: Phase,

    /// Items taken to a terminal outcome (listings or product URLs)
    pub processed: u64,

    pub succeeded: u64,

    /// Items that needed more than one attempt, whatever the outcome
    pub retried: u64,

    /// Items recorded in the failure ledger
    pub failed: u64,

    pub elapsed: Duration,

    /// Discovery only: share of listings that reached `Exhausted`
    pub completeness: Option<f64>,

    /// Discovery only: product URLs per category
    pub category_counts: BTreeMap<String, usize>,
}

impl PhaseSummary {
    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.processed as f64) * 100.0
    }

    /// Items processed per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.processed as f64 / secs
    }
}

/// Prints a phase summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &PhaseSummary) {
    println!("=== {} Summary ===\n", capitalize(&summary.phase.to_string()));

    println!("Overview:");
    println!("  Processed: {}", summary.processed);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Retried: {}", summary.retried);
    println!("  Permanently failed: {}", summary.failed);
    println!(
        "  Elapsed: {:.1}s ({:.2} per second)",
        summary.elapsed.as_secs_f64(),
        summary.throughput()
    );
    println!();

    if let Some(completeness) = summary.completeness {
        println!("Completeness: {:.1}% of listings exhausted", completeness * 100.0);
        println!();
    }

    if !summary.category_counts.is_empty() {
        println!("Products by Category:");
        let mut counts: Vec<_> = summary.category_counts.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, count) in counts {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {})",
        summary.success_rate(),
        summary.succeeded,
        summary.processed
    );
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = PhaseCounters::new();
        counters.record_success(1);
        counters.record_success(3);
        counters.record_failure(4);

        let summary = counters.snapshot(Phase::Extraction, Duration::from_secs(3));
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.retried, 2);
        assert_eq!(summary.failed, 1);
        assert!((summary.throughput() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_success_rate() {
        let counters = PhaseCounters::new();
        for _ in 0..4 {
            counters.record_success(1);
        }
        counters.record_failure(1);

        let summary = counters.snapshot(Phase::Discovery, Duration::ZERO);
        assert!((summary.success_rate() - 80.0).abs() < 0.01);
        assert_eq!(summary.throughput(), 0.0);
    }

    #[test]
    fn test_success_rate_zero_items() {
        let summary = PhaseCounters::new().snapshot(Phase::Extraction, Duration::ZERO);
        assert_eq!(summary.success_rate(), 0.0);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("discovery"), "Discovery");
    }
}

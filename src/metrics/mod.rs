//! Run metrics collection and reporting
//!
//! Every upstream call lands here exactly once, as a success or a failure
//! with its measured latency. Counters are atomic; latency samples go into a
//! per-operation mutex-guarded store and are only sorted once, when the run
//! report is taken. Skipped operations record nothing.

pub mod exporter;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Counters and latency samples for one named operation.
#[derive(Debug, Default)]
pub struct OperationStats {
    attempts: AtomicU64,
    failures: AtomicU64,
    latencies: Mutex<Vec<Duration>>,
}

impl OperationStats {
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn record(&self, latency: Duration, failed: bool) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.latencies.lock().push(latency);
    }

    fn sorted_latencies(&self) -> Vec<Duration> {
        let mut samples = self.latencies.lock().clone();
        samples.sort_unstable();
        samples
    }
}

/// Shared, append-only registry of per-operation statistics.
pub struct MetricsRegistry {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
    ops: RwLock<HashMap<&'static str, Arc<OperationStats>>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            ops: RwLock::new(HashMap::new()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Fetch or create the stats slot for an operation name.
    pub fn operation(&self, name: &'static str) -> Arc<OperationStats> {
        if let Some(stats) = self.ops.read().get(name) {
            return Arc::clone(stats);
        }
        let mut ops = self.ops.write();
        Arc::clone(ops.entry(name).or_default())
    }

    /// Record a successful call.
    pub fn record_success(&self, name: &'static str, latency: Duration) {
        self.operation(name).record(latency, false);
        exporter::observe(name, latency, false);
    }

    /// Record a failed call (non-2xx, transport error, or decode error).
    pub fn record_failure(&self, name: &'static str, latency: Duration) {
        self.operation(name).record(latency, true);
        exporter::observe(name, latency, true);
    }

    /// Total attempts and failures across all operations.
    pub fn totals(&self) -> (u64, u64) {
        let ops = self.ops.read();
        let mut attempts = 0;
        let mut failures = 0;
        for stats in ops.values() {
            attempts += stats.attempts();
            failures += stats.failures();
        }
        (attempts, failures)
    }

    /// Seconds since the registry was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Snapshot everything into a serializable run report.
    pub fn report(&self) -> RunReport {
        let wall_clock = self.elapsed();
        let ops = self.ops.read();

        let mut operations: Vec<OperationReport> = ops
            .iter()
            .map(|(name, stats)| {
                let samples = stats.sorted_latencies();
                OperationReport {
                    name: (*name).to_string(),
                    requests: stats.attempts(),
                    failures: stats.failures(),
                    requests_per_second: rate(stats.attempts(), wall_clock),
                    latency: LatencySummary::from_sorted(&samples),
                }
            })
            .collect();
        operations.sort_by(|a, b| a.name.cmp(&b.name));

        let (total_requests, total_failures) = operations
            .iter()
            .fold((0, 0), |(r, f), op| (r + op.requests, f + op.failures));

        RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            duration_secs: wall_clock.as_secs_f64(),
            total_requests,
            total_failures,
            requests_per_second: rate(total_requests, wall_clock),
            operations,
        }
    }
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Latency distribution of one operation, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencySummary {
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencySummary {
    /// Compute the summary from an ascending sample set.
    pub fn from_sorted(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let total: Duration = samples.iter().sum();
        let mean = total.as_secs_f64() * 1000.0 / samples.len() as f64;
        Self {
            mean_ms: mean,
            min_ms: as_ms(samples[0]),
            max_ms: as_ms(samples[samples.len() - 1]),
            p50_ms: as_ms(percentile(samples, 50.0)),
            p95_ms: as_ms(percentile(samples, 95.0)),
            p99_ms: as_ms(percentile(samples, 99.0)),
        }
    }
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Nearest-rank percentile over an ascending sample set.
/// Empty input yields a zero duration.
pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Per-operation section of the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub name: String,
    pub requests: u64,
    pub failures: u64,
    pub requests_per_second: f64,
    pub latency: LatencySummary,
}

/// Final report for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub total_requests: u64,
    pub total_failures: u64,
    pub requests_per_second: f64,
    pub operations: Vec<OperationReport>,
}

impl RunReport {
    /// Render the report as the table printed at the end of a run.
    pub fn format_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<26} {:>9} {:>9} {:>8} {:>9} {:>9} {:>9} {:>9}\n",
            "operation", "requests", "failures", "req/s", "mean ms", "p50 ms", "p95 ms", "p99 ms"
        ));
        out.push_str(&"-".repeat(94));
        out.push('\n');
        for op in &self.operations {
            out.push_str(&format!(
                "{:<26} {:>9} {:>9} {:>8.2} {:>9.1} {:>9.1} {:>9.1} {:>9.1}\n",
                op.name,
                op.requests,
                op.failures,
                op.requests_per_second,
                op.latency.mean_ms,
                op.latency.p50_ms,
                op.latency.p95_ms,
                op.latency.p99_ms,
            ));
        }
        out.push_str(&"-".repeat(94));
        out.push('\n');
        out.push_str(&format!(
            "{:<26} {:>9} {:>9} {:>8.2}   ({:.1}s wall clock)\n",
            "total",
            self.total_requests,
            self.total_failures,
            self.requests_per_second,
            self.duration_secs,
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_record_and_totals() {
        let registry = MetricsRegistry::new();
        registry.record_success("get_account", ms(10));
        registry.record_success("get_account", ms(20));
        registry.record_failure("get_account", ms(30));
        registry.record_failure("login", ms(5));

        let stats = registry.operation("get_account");
        assert_eq!(stats.attempts(), 3);
        assert_eq!(stats.failures(), 1);

        let (attempts, failures) = registry.totals();
        assert_eq!(attempts, 4);
        assert_eq!(failures, 2);
    }

    #[test]
    fn test_unrecorded_operation_is_absent_from_report() {
        let registry = MetricsRegistry::new();
        registry.record_success("login", ms(5));
        let report = registry.report();
        assert_eq!(report.operations.len(), 1);
        assert_eq!(report.operations[0].name, "login");
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let samples: Vec<Duration> = (1..=100).map(ms).collect();
        assert_eq!(percentile(&samples, 50.0), ms(50));
        assert_eq!(percentile(&samples, 95.0), ms(95));
        assert_eq!(percentile(&samples, 99.0), ms(99));
        assert_eq!(percentile(&samples, 100.0), ms(100));
    }

    #[test]
    fn test_percentile_small_sets() {
        assert_eq!(percentile(&[], 50.0), Duration::ZERO);
        assert_eq!(percentile(&[ms(7)], 50.0), ms(7));
        assert_eq!(percentile(&[ms(7)], 99.0), ms(7));
        let two = [ms(1), ms(9)];
        assert_eq!(percentile(&two, 50.0), ms(1));
        assert_eq!(percentile(&two, 99.0), ms(9));
    }

    #[test]
    fn test_latency_summary() {
        let samples: Vec<Duration> = vec![ms(10), ms(20), ms(30), ms(40)];
        let summary = LatencySummary::from_sorted(&samples);
        assert!((summary.mean_ms - 25.0).abs() < 1e-9);
        assert!((summary.min_ms - 10.0).abs() < 1e-9);
        assert!((summary.max_ms - 40.0).abs() < 1e-9);
        assert!((summary.p50_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let registry = MetricsRegistry::new();
        registry.record_success("credit_account", ms(12));
        let report = registry.report();
        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_requests, 1);
        assert_eq!(parsed.operations[0].name, "credit_account");
    }

    #[test]
    fn test_format_table_contains_rows() {
        let registry = MetricsRegistry::new();
        registry.record_success("login", ms(5));
        registry.record_failure("credit_account", ms(8));
        let table = registry.report().format_table();
        assert!(table.contains("login"));
        assert!(table.contains("credit_account"));
        assert!(table.contains("total"));
    }
}

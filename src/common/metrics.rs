//! Vote pipeline metrics
//!
//! Prometheus-compatible counters for the admission pipeline:
//! - Submission, queueing and requeue counters
//! - Terminal outcome counters (committed / rejected)
//! - Replication failures and rollbacks
//! - Admission latency histogram (enqueue to terminal outcome)

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Histogram bucket boundaries for latency measurements (in milliseconds)
const LATENCY_BUCKETS: [f64; 11] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

/// A simple histogram implementation for latency tracking
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    boundaries: Vec<f64>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new() -> Self {
        let boundaries = LATENCY_BUCKETS.to_vec();
        let buckets = (0..=boundaries.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            boundaries,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a value in milliseconds
    pub fn observe(&self, value_ms: f64) {
        let idx = self
            .boundaries
            .iter()
            .position(|&b| value_ms <= b)
            .unwrap_or(self.boundaries.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((value_ms * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative `(upper_bound, count)` pairs, ending with `+Inf`
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        let mut cumulative = 0u64;
        let mut result = Vec::with_capacity(self.buckets.len());
        for (i, bucket) in self.buckets.iter().enumerate() {
            cumulative += bucket.load(Ordering::Relaxed);
            let bound = self.boundaries.get(i).copied().unwrap_or(f64::INFINITY);
            result.push((bound, cumulative));
        }
        result
    }

    pub fn sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter for tracking event counts
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Metrics owned by one coordinator instance
#[derive(Debug)]
pub struct VoteMetrics {
    pub votes_submitted: Counter,
    pub votes_queued: Counter,
    pub votes_requeued: Counter,
    pub votes_committed: Counter,
    pub votes_rejected: Counter,
    pub replication_failures: Counter,
    pub rollbacks: Counter,
    pub registrations: Counter,
    pub admission_latency: Histogram,
    start_time: Instant,
}

impl VoteMetrics {
    pub fn new() -> Self {
        Self {
            votes_submitted: Counter::new(),
            votes_queued: Counter::new(),
            votes_requeued: Counter::new(),
            votes_committed: Counter::new(),
            votes_rejected: Counter::new(),
            replication_failures: Counter::new(),
            rollbacks: Counter::new(),
            registrations: Counter::new(),
            admission_latency: Histogram::new(),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Render Prometheus text exposition. `queue_len` and `in_flight` are
    /// sampled by the caller.
    pub fn to_prometheus(&self, queue_len: usize, in_flight: usize) -> String {
        let mut out = String::new();
        let counters = [
            ("minivote_votes_submitted_total", "Vote RPCs received", &self.votes_submitted),
            ("minivote_votes_queued_total", "Vote requests accepted into the queue", &self.votes_queued),
            ("minivote_votes_requeued_total", "Queue entries requeued behind an in-progress voter", &self.votes_requeued),
            ("minivote_votes_committed_total", "Votes committed and replicated", &self.votes_committed),
            ("minivote_votes_rejected_total", "Votes terminally rejected", &self.votes_rejected),
            ("minivote_replication_failures_total", "Replication attempts that missed quorum", &self.replication_failures),
            ("minivote_rollbacks_total", "Registry mutations rolled back", &self.rollbacks),
            ("minivote_registrations_total", "New voters registered", &self.registrations),
        ];
        for (name, help, counter) in counters {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{} {}", name, counter.get());
        }

        let _ = writeln!(out, "# HELP minivote_queue_length Pending vote requests");
        let _ = writeln!(out, "# TYPE minivote_queue_length gauge");
        let _ = writeln!(out, "minivote_queue_length {}", queue_len);
        let _ = writeln!(out, "# HELP minivote_in_flight Admission tasks running");
        let _ = writeln!(out, "# TYPE minivote_in_flight gauge");
        let _ = writeln!(out, "minivote_in_flight {}", in_flight);
        let _ = writeln!(out, "# HELP minivote_uptime_seconds Server uptime in seconds");
        let _ = writeln!(out, "# TYPE minivote_uptime_seconds gauge");
        let _ = writeln!(out, "minivote_uptime_seconds {}", self.uptime_seconds());

        let _ = writeln!(
            out,
            "# HELP minivote_admission_duration_ms Enqueue to terminal outcome in milliseconds"
        );
        let _ = writeln!(out, "# TYPE minivote_admission_duration_ms histogram");
        for (le, count) in self.admission_latency.get_buckets() {
            if le.is_infinite() {
                let _ = writeln!(out, "minivote_admission_duration_ms_bucket{{le=\"+Inf\"}} {}", count);
            } else {
                let _ = writeln!(out, "minivote_admission_duration_ms_bucket{{le=\"{}\"}} {}", le, count);
            }
        }
        let _ = writeln!(out, "minivote_admission_duration_ms_sum {}", self.admission_latency.sum());
        let _ = writeln!(out, "minivote_admission_duration_ms_count {}", self.admission_latency.count());

        out
    }
}

impl Default for VoteMetrics {
    fn default() -> Self {
        Self::new()
    }
}

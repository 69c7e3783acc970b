//! Running counters and the end-of-run summary.

use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Counters accumulated over one run.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Valid process numbers scheduled for the run
    pub total: usize,
    processed: HashSet<String>,
    failing: HashSet<String>,
    /// Extraction attempts across all rounds
    pub attempts: usize,
    pub inserts: usize,
    pub updates: usize,
    pub failed_attempts: usize,
    pub invalid: usize,
    pub started_at: DateTime<Local>,
    started: Instant,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RunStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: HashSet::new(),
            failing: HashSet::new(),
            attempts: 0,
            inserts: 0,
            updates: 0,
            failed_attempts: 0,
            invalid: 0,
            started_at: Local::now(),
            started: Instant::now(),
        }
    }

    /// Distinct process numbers attempted at least once.
    pub fn processed(&self) -> usize {
        self.processed.len()
    }

    pub fn successes(&self) -> usize {
        self.inserts + self.updates
    }

    /// Distinct process numbers whose latest attempt failed.
    pub fn failing(&self) -> usize {
        self.failing.len()
    }

    pub fn record_attempt(&mut self, canonical: &str) {
        self.attempts += 1;
        self.processed.insert(canonical.to_string());
    }

    pub fn record_insert(&mut self, canonical: &str) {
        self.inserts += 1;
        self.failing.remove(canonical);
    }

    pub fn record_update(&mut self, canonical: &str) {
        self.updates += 1;
        self.failing.remove(canonical);
    }

    pub fn record_failure(&mut self, canonical: &str) {
        self.failed_attempts += 1;
        self.failing.insert(canonical.to_string());
    }

    pub fn record_invalid(&mut self) {
        self.invalid += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Successes over distinct processed numbers, in percent.
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let processed = self.processed();
        if processed == 0 {
            return 0.0;
        }
        (self.successes() as f64 / processed as f64) * 100.0
    }

    /// Expected time left at the current rate, `None` before the first number.
    #[allow(clippy::cast_precision_loss)]
    pub fn remaining(&self) -> Option<Duration> {
        let processed = self.processed();
        if processed == 0 {
            return None;
        }
        let per_item = self.elapsed().as_secs_f64() / processed as f64;
        let left = self.total.saturating_sub(processed) as f64;
        Some(Duration::from_secs_f64(per_item * left))
    }

    /// Wall-clock estimate of completion, `HH:MM:SS`.
    pub fn eta(&self) -> String {
        match self
            .remaining()
            .and_then(|d| ChronoDuration::from_std(d).ok())
        {
            Some(left) => (Local::now() + left).format("%H:%M:%S").to_string(),
            None => "--:--:--".to_string(),
        }
    }

    /// One-line progress view for the console.
    pub fn progress_line(&self) -> String {
        format!(
            "{}/{} processed, {} ok, {} failing, ETA {}",
            self.processed(),
            self.total,
            self.successes(),
            self.failing(),
            self.eta()
        )
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed().as_secs();
        writeln!(f, "Progress: {}/{} processed", self.processed(), self.total)?;
        writeln!(
            f,
            "Succeeded: {} ({} inserted, {} updated)",
            self.successes(),
            self.inserts,
            self.updates
        )?;
        writeln!(
            f,
            "Failed: {} numbers ({} failed attempts)",
            self.failing(),
            self.failed_attempts
        )?;
        writeln!(f, "Invalid numbers: {}", self.invalid)?;
        writeln!(f, "Success rate: {:.1}%", self.success_rate())?;
        write!(
            f,
            "Elapsed: {:02}:{:02}:{:02}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }
}

//! Batch orchestrator for one monitoring run.
//!
//! Validates the process numbers, drives each one through extraction and
//! reconciliation, retries failures in later rounds and finally hands the
//! still-failing numbers to change detection.

use crate::detector::{ChangeDetector, DetectionReport};
use crate::error::{MonitorError, Result};
use crate::extractor::ProcessExtractor;
use crate::notifier::Notifier;
use crate::reconciler::{ReconcileStatus, RecordReconciler};
use crate::stats::RunStats;
use paineel_browser::BrowserActions;
use paineel_core::{ExecutionConfig, PaineelError, ProcessNumber, RunControl};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Time and size limits of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunBudget {
    pub deadline: Instant,
    pub max_retry_rounds: u32,
    pub max_processes: Option<usize>,
}

impl RunBudget {
    /// Budget starting now.
    pub fn starting_now(config: &ExecutionConfig) -> Self {
        Self::with_time_limit(config, config.max_execution())
    }

    pub fn with_time_limit(config: &ExecutionConfig, limit: Duration) -> Self {
        Self {
            deadline: Instant::now() + limit,
            max_retry_rounds: config.max_retry_rounds.max(1),
            max_processes: config.max_processes.filter(|&cap| cap > 0),
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Final classification of one process number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Inserted,
    Updated,
    Failed(String),
    Invalid(String),
}

impl OutcomeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Process number as given
    pub identifier: String,
    pub status: OutcomeStatus,
    /// Round that produced `status`, 0 for invalid numbers
    pub round: u32,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One entry per input number, in first-seen order
    pub outcomes: Vec<ProcessOutcome>,
    pub stats: RunStats,
    /// Numbers still failing after the last round
    pub still_failed: Vec<String>,
    pub changes: Option<DetectionReport>,
    pub cancelled: bool,
    pub deadline_hit: bool,
}

impl RunReport {
    pub fn count(&self, predicate: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }
}

/// A validated number scheduled for processing.
#[derive(Debug, Clone)]
struct Pending {
    number: ProcessNumber,
    raw: String,
}

enum Step {
    Continue,
    Cancelled,
    DeadlineHit,
}

/// Drives one run over a single browser session.
///
/// Numbers are processed strictly one after another. Pause, step mode,
/// cancellation and the deadline are honoured between numbers only, never
/// during an extraction.
pub struct Orchestrator {
    browser: Arc<dyn BrowserActions>,
    extractor: ProcessExtractor,
    reconciler: Arc<RecordReconciler>,
    control: RunControl,
    execution: ExecutionConfig,
    detection: Option<(ChangeDetector, Box<dyn Notifier>)>,
    stats: Arc<Mutex<RunStats>>,
}

impl Orchestrator {
    pub fn new(
        browser: Arc<dyn BrowserActions>,
        extractor: ProcessExtractor,
        reconciler: Arc<RecordReconciler>,
        control: RunControl,
        execution: ExecutionConfig,
    ) -> Self {
        Self {
            browser,
            extractor,
            reconciler,
            control,
            execution,
            detection: None,
            stats: Arc::new(Mutex::new(RunStats::default())),
        }
    }

    /// Enable change detection and notification at the end of the run.
    #[must_use]
    pub fn with_notifier(mut self, detector: ChangeDetector, notifier: Box<dyn Notifier>) -> Self {
        self.detection = Some((detector, notifier));
        self
    }

    /// Live statistics, readable while the run is in progress.
    pub fn stats(&self) -> Arc<Mutex<RunStats>> {
        self.stats.clone()
    }

    fn lock_stats(&self) -> MutexGuard<'_, RunStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run with the configured time limit.
    pub async fn run(&self, explicit: Option<Vec<String>>) -> Result<RunReport> {
        self.run_with_budget(explicit, RunBudget::starting_now(&self.execution))
            .await
    }

    /// Process `explicit`, or every number in the ledger when `None`.
    ///
    /// Fails only before processing starts: when the ledger cannot be listed
    /// or no valid number remains.
    pub async fn run_with_budget(
        &self,
        explicit: Option<Vec<String>>,
        budget: RunBudget,
    ) -> Result<RunReport> {
        let raw_numbers = match explicit {
            Some(list) => list,
            None => self
                .reconciler
                .list_identifiers()
                .await
                .map_err(|e| MonitorError::FatalConfig(format!("cannot list ledger: {e}")))?,
        };

        let mut outcomes = Vec::new();
        let mut queue = Vec::new();
        let mut seen = HashSet::new();
        let mut invalid = 0;
        for raw in raw_numbers {
            match ProcessNumber::parse(&raw) {
                Ok(number) => {
                    if seen.insert(number.clone()) {
                        queue.push(Pending {
                            number,
                            raw: raw.trim().to_string(),
                        });
                    }
                }
                Err(e) => {
                    warn!("skipping: {}", e);
                    invalid += 1;
                    outcomes.push(ProcessOutcome {
                        identifier: raw,
                        status: OutcomeStatus::Invalid(e.to_string()),
                        round: 0,
                    });
                }
            }
        }
        if let Some(cap) = budget.max_processes.filter(|&cap| cap > 0) {
            queue.truncate(cap);
        }
        if queue.is_empty() {
            return Err(MonitorError::FatalConfig(
                "no valid process numbers to monitor".to_string(),
            ));
        }

        {
            let mut stats = self.lock_stats();
            *stats = RunStats::new(queue.len());
            for _ in 0..invalid {
                stats.record_invalid();
            }
        }
        info!(
            total = queue.len(),
            invalid,
            rounds = budget.max_retry_rounds,
            "run started"
        );

        let mut index: HashMap<ProcessNumber, usize> = HashMap::new();
        let mut cancelled = false;
        let mut deadline_hit = false;
        let mut retry: Vec<Pending> = Vec::new();

        for round in 1..=budget.max_retry_rounds {
            let current = if round == 1 {
                std::mem::take(&mut queue)
            } else {
                if retry.is_empty() {
                    break;
                }
                info!(round, pending = retry.len(), "retry round");
                std::mem::take(&mut retry)
            };

            let mut items = current.into_iter();
            while let Some(item) = items.next() {
                match self.boundary(&budget).await {
                    Step::Continue => {}
                    Step::Cancelled => cancelled = true,
                    Step::DeadlineHit => deadline_hit = true,
                }
                if cancelled || deadline_hit {
                    // Failures from earlier rounds stay failed.
                    if round > 1 {
                        retry.push(item);
                        retry.extend(items);
                    }
                    break;
                }

                let status = self.process_one(&item, round).await;
                if matches!(status, OutcomeStatus::Failed(_)) {
                    retry.push(item.clone());
                }

                let outcome = ProcessOutcome {
                    identifier: item.raw.clone(),
                    status,
                    round,
                };
                match index.get(&item.number) {
                    Some(&pos) => outcomes[pos] = outcome,
                    None => {
                        index.insert(item.number.clone(), outcomes.len());
                        outcomes.push(outcome);
                    }
                }
            }

            if cancelled || deadline_hit {
                break;
            }
        }

        let still_failed: Vec<String> = retry.into_iter().map(|p| p.raw).collect();
        if deadline_hit {
            warn!("time limit reached, stopping");
        }

        let changes = match (&self.detection, cancelled) {
            (Some((detector, notifier)), false) => {
                match detector
                    .run(&self.reconciler, &still_failed, notifier.as_ref())
                    .await
                {
                    Ok(report) => Some(report),
                    Err(e) => {
                        error!("change detection failed: {}", e);
                        None
                    }
                }
            }
            (None, _) => {
                debug!("no notification channel configured");
                None
            }
            (Some(_), true) => None,
        };

        let stats = self.lock_stats().clone();
        info!(
            processed = stats.processed(),
            total = stats.total,
            still_failed = still_failed.len(),
            "run finished"
        );

        Ok(RunReport {
            outcomes,
            stats,
            still_failed,
            changes,
            cancelled,
            deadline_hit,
        })
    }

    async fn boundary(&self, budget: &RunBudget) -> Step {
        match self.control.checkpoint().await {
            Err(PaineelError::Cancelled) => {
                info!("stop requested");
                return Step::Cancelled;
            }
            Err(e) => warn!("run control: {}", e),
            Ok(()) => {}
        }
        if budget.expired() {
            Step::DeadlineHit
        } else {
            Step::Continue
        }
    }

    /// One extraction and reconciliation, followed by session cleanup.
    async fn process_one(&self, item: &Pending, round: u32) -> OutcomeStatus {
        self.lock_stats().record_attempt(item.number.as_str());
        info!(process = %item.raw, round, "processing");

        let browser = self.browser.as_ref();
        let result = match self.extractor.extract(browser, &item.raw).await {
            Ok(record) => self.reconciler.reconcile(&record).await,
            Err(e) => Err(e),
        };

        if let Err(e) = browser.clear_cookies().await {
            warn!("clearing cookies: {}", e);
        }
        if let Err(e) = browser.close_other_tabs().await {
            warn!("closing tabs: {}", e);
        }
        let purged = self.extractor.purge_captchas();
        debug!(purged, "challenge images removed");

        let mut stats = self.lock_stats();
        let status = match result {
            Ok(ReconcileStatus::Inserted) => {
                stats.record_insert(item.number.as_str());
                OutcomeStatus::Inserted
            }
            Ok(ReconcileStatus::Updated) => {
                stats.record_update(item.number.as_str());
                OutcomeStatus::Updated
            }
            Err(e) => {
                error!(process = %item.raw, round, "failed: {}", e);
                stats.record_failure(item.number.as_str());
                OutcomeStatus::Failed(e.to_string())
            }
        };
        info!("{}", stats.progress_line());
        status
    }
}

//! Compares the ledger against the previous run and reports what changed.

use crate::error::Result;
use crate::notifier::{ChangeEvent, ChangeKind, Notification, Notifier};
use crate::reconciler::{data_rows, RecordReconciler};
use crate::snapshot::{Fingerprint, Snapshot, SnapshotStore};
use tracing::{error, info, warn};

/// What one detection pass found and whether it was sent.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    pub events: Vec<ChangeEvent>,
    pub notified: bool,
}

/// Build the next snapshot from ledger `values` and classify each row
/// against `prior`.
///
/// Progress is compared before documents, so a row whose progress and
/// documents both changed yields a single `ProgressChanged` event. Rows
/// sharing a canonical key keep the first occurrence.
pub fn diff(prior: &Snapshot, values: &[Vec<String>]) -> (Snapshot, Vec<ChangeEvent>) {
    let mut next = Snapshot::new();
    let mut events = Vec::new();

    for row in data_rows(values) {
        let key = row.key();
        if next.contains_key(&key) {
            continue;
        }
        let current = Fingerprint::from(&row);

        let kind = match prior.get(&key) {
            None => Some(ChangeKind::New),
            Some(before) if before.progress_descriptions != current.progress_descriptions => {
                Some(ChangeKind::ProgressChanged)
            }
            Some(before) if before.document_numbers != current.document_numbers => {
                Some(ChangeKind::DocumentChanged)
            }
            Some(_) => None,
        };

        if let Some(kind) = kind {
            events.push(ChangeEvent {
                identifier: row.process.trim().to_string(),
                kind,
                row,
            });
        }
        next.insert(key, current);
    }

    (next, events)
}

/// Snapshot-diff change detection over the whole ledger.
pub struct ChangeDetector {
    snapshots: SnapshotStore,
}

impl ChangeDetector {
    pub fn new(snapshots: SnapshotStore) -> Self {
        Self { snapshots }
    }

    /// Diff the ledger, persist the new snapshot and notify when there is
    /// anything to report.
    ///
    /// `still_failed` are the process numbers left failing after every retry
    /// round; they alone are enough to trigger a notification. A ledger read
    /// with no rows at all leaves the stored snapshot untouched.
    pub async fn run(
        &self,
        reconciler: &RecordReconciler,
        still_failed: &[String],
        notifier: &dyn Notifier,
    ) -> Result<DetectionReport> {
        let prior = self.snapshots.load();
        let values = reconciler.read_all().await?;

        let events = if values.is_empty() {
            warn!("ledger returned no rows, keeping previous snapshot");
            Vec::new()
        } else {
            let (next, events) = diff(&prior, &values);
            if let Err(e) = self.snapshots.save(&next) {
                error!(
                    "could not save snapshot {}: {}",
                    self.snapshots.path().display(),
                    e
                );
            }
            events
        };

        info!(
            changes = events.len(),
            failed = still_failed.len(),
            "change detection finished"
        );

        let notification = Notification::new(events, still_failed.to_vec());
        if notification.is_empty() {
            return Ok(DetectionReport {
                events: notification.events,
                notified: false,
            });
        }

        let notified = match notifier.notify(&notification).await {
            Ok(()) => true,
            Err(e) => {
                error!("notification not delivered: {}", e);
                false
            }
        };

        Ok(DetectionReport {
            events: notification.events,
            notified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(ToString::to_string).collect()
    }

    fn ledger(rows: &[Vec<String>]) -> Vec<Vec<String>> {
        let mut values = vec![row(&["PROCESSOS", "Tipo"])];
        values.extend_from_slice(rows);
        values
    }

    fn full(id: &str, docs: &str, progress: &str) -> Vec<String> {
        row(&[id, "Outorga", "ACME", docs, "", "", "", "", "", "", progress])
    }

    #[test]
    fn test_first_sight_is_new() {
        let (next, events) = diff(&Snapshot::new(), &ledger(&[full("12.345", "1", "a")]));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::New);
        assert_eq!(events[0].identifier, "12.345");
        assert!(next.contains_key("12345"));
    }

    #[test]
    fn test_unchanged_ledger_gives_no_events() {
        let values = ledger(&[full("12345", "1", "a"), full("67890", "2", "b")]);
        let (first, _) = diff(&Snapshot::new(), &values);
        let (second, events) = diff(&first, &values);
        assert!(events.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_progress_takes_precedence_over_documents() {
        let (prior, _) = diff(&Snapshot::new(), &ledger(&[full("12345", "1", "a")]));

        let (_, events) = diff(&prior, &ledger(&[full("12345", "1\n2", "a\nb")]));
        assert_eq!(events[0].kind, ChangeKind::ProgressChanged);

        let (_, events) = diff(&prior, &ledger(&[full("12345", "1\n2", "a")]));
        assert_eq!(events[0].kind, ChangeKind::DocumentChanged);
    }

    #[test]
    fn test_unkeyed_rows_are_skipped() {
        let values = ledger(&[row(&["", "x"]), row(&["abc"]), Vec::new()]);
        let (next, events) = diff(&Snapshot::new(), &values);
        assert!(next.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_volatile_columns_do_not_trigger_events() {
        let (prior, _) = diff(&Snapshot::new(), &ledger(&[full("12345", "1", "a")]));
        let mut changed = full("12345", "1", "a");
        changed[7] = "OTHER UNIT".to_string();
        changed[8] = "02/02/2024".to_string();
        let (_, events) = diff(&prior, &ledger(&[changed]));
        assert!(events.is_empty());
    }
}

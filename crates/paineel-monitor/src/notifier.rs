//! What the monitor hands to whoever delivers notifications.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use paineel_core::LedgerRow;

/// Kind of change found between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Process absent from the previous snapshot
    New,
    /// Progress descriptions differ
    ProgressChanged,
    /// Progress unchanged but document numbers differ
    DocumentChanged,
}

impl ChangeKind {
    /// Short label shown next to the process number.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "Novo",
            Self::ProgressChanged => "Andamento",
            Self::DocumentChanged => "Documento",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::New => "Processo adicionado ao monitoramento",
            Self::ProgressChanged => "Novos andamentos detectados",
            Self::DocumentChanged => "Novos documentos detectados",
        }
    }
}

/// One detected change, carrying the current ledger row as payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Process number as written in the ledger
    pub identifier: String,
    pub kind: ChangeKind,
    pub row: LedgerRow,
}

/// Consolidated report for one run.
#[derive(Debug, Clone)]
pub struct Notification {
    pub subject: String,
    pub generated_at: DateTime<Local>,
    pub events: Vec<ChangeEvent>,
    /// Process numbers still failing after every retry round
    pub failed: Vec<String>,
}

impl Notification {
    pub fn new(events: Vec<ChangeEvent>, failed: Vec<String>) -> Self {
        Self::at(Local::now(), events, failed)
    }

    pub fn at(
        generated_at: DateTime<Local>,
        events: Vec<ChangeEvent>,
        failed: Vec<String>,
    ) -> Self {
        Self {
            subject: format!(
                "SEI ANEEL - Relatório de Monitoramento ({})",
                generated_at.format("%d/%m/%Y %H:%M")
            ),
            generated_at,
            events,
            failed,
        }
    }

    /// Nothing worth sending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.failed.is_empty()
    }
}

/// Delivers a notification; transport is entirely up to the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_subject_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 9, 7, 0).unwrap();
        let n = Notification::at(at, Vec::new(), vec!["12345".to_string()]);
        assert_eq!(n.subject, "SEI ANEEL - Relatório de Monitoramento (05/03/2024 09:07)");
        assert!(!n.is_empty());
        assert!(Notification::at(at, Vec::new(), Vec::new()).is_empty());
    }
}

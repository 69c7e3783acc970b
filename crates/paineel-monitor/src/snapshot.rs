//! Persisted fingerprints of the previous run.

use paineel_core::LedgerRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Non-volatile fields of a ledger row used to decide whether it changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    #[serde(rename = "tipo", default)]
    pub kind: String,
    #[serde(rename = "interessados", default)]
    pub interested_parties: String,
    #[serde(rename = "documentos_nr", default)]
    pub document_numbers: String,
    #[serde(rename = "documentos_tipo", default)]
    pub document_types: String,
    #[serde(rename = "andamentos_data", default)]
    pub progress_dates: String,
    #[serde(rename = "andamentos_descricao", default)]
    pub progress_descriptions: String,
}

impl From<&LedgerRow> for Fingerprint {
    fn from(row: &LedgerRow) -> Self {
        Self {
            kind: row.kind.clone(),
            interested_parties: row.interested_parties.clone(),
            document_numbers: row.document_numbers.clone(),
            document_types: row.document_types.clone(),
            progress_dates: row.progress_dates.clone(),
            progress_descriptions: row.progress_descriptions.clone(),
        }
    }
}

/// Canonical process number to fingerprint.
pub type Snapshot = BTreeMap<String, Fingerprint>;

/// JSON file holding the last [`Snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot. Absent or unreadable files give an empty map.
    pub fn load(&self) -> Snapshot {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no snapshot at {}", self.path.display());
                return Snapshot::new();
            }
            Err(e) => {
                warn!("could not read snapshot {}: {}", self.path.display(), e);
                return Snapshot::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring corrupt snapshot {}: {}", self.path.display(), e);
            Snapshot::new()
        })
    }

    /// Replace the stored snapshot.
    pub fn save(&self, snapshot: &Snapshot) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("absent.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(SnapshotStore::new(path).load().is_empty());
    }

    #[test]
    fn test_save_creates_parent_and_uses_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested").join("snapshot.json"));

        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "12345".to_string(),
            Fingerprint {
                kind: "Outorga".to_string(),
                progress_descriptions: "Despacho".to_string(),
                ..Fingerprint::default()
            },
        );
        store.save(&snapshot).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"tipo\": \"Outorga\""));
        assert!(raw.contains("\"andamentos_descricao\": \"Despacho\""));
        assert_eq!(store.load(), snapshot);
    }

    #[test]
    fn test_partial_entries_default_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, r#"{"12345": {"tipo": "X"}}"#).unwrap();

        let loaded = SnapshotStore::new(path).load();
        assert_eq!(loaded["12345"].kind, "X");
        assert!(loaded["12345"].document_numbers.is_empty());
    }
}

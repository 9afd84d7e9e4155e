// ── Rule storage ──
//
// Concurrent in-memory storage for FirewallRule records, optionally backed
// by a JSON file that is reloaded on open and rewritten after every
// mutation. The store knows nothing about the provider; it is the
// best-effort cache side of the sync protocol, so persistence failures are
// logged and do not fail the mutation that triggered them.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::model::{FirewallRule, SyncStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Concurrent rule storage.
///
/// Every accessor hands out `Arc<FirewallRule>` snapshots; mutation goes
/// through clone-and-replace, so readers never observe a half-written rule.
pub struct RuleStore {
    rules: DashMap<Uuid, Arc<FirewallRule>>,
    path: Option<PathBuf>,
}

impl RuleStore {
    /// Volatile store with no file backing.
    pub fn in_memory() -> Self {
        Self {
            rules: DashMap::new(),
            path: None,
        }
    }

    /// File-backed store. Loads existing records when the file is present;
    /// a missing file is an empty store, a corrupt file is an error.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let rules = DashMap::new();

        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let records: Vec<FirewallRule> = serde_json::from_str(&raw)?;
            for rule in records {
                rules.insert(rule.id, Arc::new(rule));
            }
        }

        Ok(Self {
            rules,
            path: Some(path),
        })
    }

    // ── Contract ─────────────────────────────────────────────────

    /// All rules, oldest first (stable ordering for list output).
    pub fn list(&self) -> Vec<Arc<FirewallRule>> {
        let mut all: Vec<Arc<FirewallRule>> =
            self.rules.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        all
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<FirewallRule>> {
        self.rules.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Insert a fully-formed rule record.
    pub fn create(&self, rule: FirewallRule) -> Arc<FirewallRule> {
        let stored = Arc::new(rule);
        self.rules.insert(stored.id, Arc::clone(&stored));
        self.persist();
        stored
    }

    /// Replace the record's fields through `mutate`. Returns the updated
    /// record, or `None` when the id is absent.
    pub fn update(
        &self,
        id: &Uuid,
        mutate: impl FnOnce(&mut FirewallRule),
    ) -> Option<Arc<FirewallRule>> {
        let updated = {
            let mut entry = self.rules.get_mut(id)?;
            let mut rule = (**entry.value()).clone();
            mutate(&mut rule);
            let updated = Arc::new(rule);
            *entry.value_mut() = Arc::clone(&updated);
            updated
        };
        self.persist();
        Some(updated)
    }

    /// Remove the record. Returns `false` when the id is absent.
    pub fn delete(&self, id: &Uuid) -> bool {
        let removed = self.rules.remove(id).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Status-only write used by the reconciliation pass.
    ///
    /// `error` is kept only for `failed` / `not_applicable`; any other
    /// status clears it. Returns `false` when the id is absent.
    pub fn update_sync_status(
        &self,
        id: &Uuid,
        status: SyncStatus,
        error: Option<String>,
    ) -> bool {
        self.update(id, |rule| {
            rule.sync_status = status;
            rule.sync_error = match status {
                SyncStatus::Failed | SyncStatus::NotApplicable => error,
                SyncStatus::Pending | SyncStatus::Synced => None,
            };
        })
        .is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    // ── Persistence ──────────────────────────────────────────────

    /// Rewrite the backing file. Best-effort: the in-memory state is
    /// already the cache of record, so a write failure only warns.
    fn persist(&self) {
        let Some(ref path) = self.path else {
            return;
        };

        let records: Vec<FirewallRule> = self.list().iter().map(|r| (**r).clone()).collect();

        let result = serde_json::to_string_pretty(&records)
            .map_err(std::io::Error::other)
            .and_then(|json| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, json)
            });

        if let Err(err) = result {
            warn!(path = %path.display(), error = %err, "rule store persistence failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::model::{Direction, Protocol, RuleAction, RuleStatus};

    use super::*;

    fn sample_rule() -> FirewallRule {
        FirewallRule {
            id: Uuid::new_v4(),
            name: "ssh".into(),
            action: RuleAction::Allow,
            direction: Direction::Ingress,
            protocol: Protocol::Tcp,
            port_range: None,
            source: None,
            destination: None,
            status: RuleStatus::Enabled,
            sync_status: SyncStatus::Pending,
            sync_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn update_and_delete_signal_not_found() {
        let store = RuleStore::in_memory();
        let missing = Uuid::new_v4();

        assert!(store.update(&missing, |_| {}).is_none());
        assert!(!store.delete(&missing));
        assert!(!store.update_sync_status(&missing, SyncStatus::Synced, None));
    }

    #[test]
    fn sync_status_write_clears_error_on_synced() {
        let store = RuleStore::in_memory();
        let rule = store.create(sample_rule());

        assert!(store.update_sync_status(
            &rule.id,
            SyncStatus::Failed,
            Some("rule not found in provider".into())
        ));
        let failed = store.get(&rule.id).expect("rule exists");
        assert_eq!(failed.sync_status, SyncStatus::Failed);
        assert!(failed.sync_error.is_some());

        assert!(store.update_sync_status(&rule.id, SyncStatus::Synced, None));
        let synced = store.get(&rule.id).expect("rule exists");
        assert_eq!(synced.sync_status, SyncStatus::Synced);
        assert_eq!(synced.sync_error, None);
    }

    #[test]
    fn list_is_ordered_by_creation_time() {
        let store = RuleStore::in_memory();
        let mut first = sample_rule();
        first.created_at = Utc::now() - chrono::Duration::seconds(60);
        let first_id = first.id;
        store.create(sample_rule());
        store.create(first);

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first_id);
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rules.json");

        let store = RuleStore::open(path.clone()).expect("open");
        let rule = store.create(sample_rule());
        store.update(&rule.id, |r| r.name = "ssh-admin".into());

        let reopened = RuleStore::open(path).expect("reopen");
        assert_eq!(reopened.len(), 1);
        let loaded = reopened.get(&rule.id).expect("rule persisted");
        assert_eq!(loaded.name, "ssh-admin");
    }

    #[test]
    fn corrupt_store_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "not json").expect("write");

        assert!(matches!(
            RuleStore::open(path),
            Err(StoreError::Corrupt(_))
        ));
    }
}

//! In-process backend. One lock guards every table, so each call is a serializable
//! transaction.

use crate::repository::{InsertOutcome, VaultRepository};
use crate::DatabaseError;
use async_trait::async_trait;
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::RwLock;
use pvault_domain::records::{AuditRecord, EntryMeta, ProviderRecord, VaultEntry};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Tables {
    providers: BTreeMap<i64, ProviderRecord>,
    entries: FxHashMap<String, VaultEntry>,
    words: FxHashMap<String, Vec<String>>,
    nodes: BTreeMap<i64, i64>,
    audit: Vec<AuditRecord>,
}

impl Tables {
    fn drop_entry(&mut self, vid: &str) -> bool {
        self.words.remove(vid);
        self.entries.remove(vid).is_some()
    }
}

#[derive(Debug, Default)]
struct Faults {
    offline: AtomicBool,
    word_writes: AtomicBool,
}

/// `memory://` repository. Cheap to clone; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail as if the engine were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.faults.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes every write that carries search words fail before anything is applied.
    pub fn fail_word_writes(&self, fail: bool) {
        self.faults.word_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the audit table.
    #[must_use]
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.tables.read().audit.clone()
    }

    #[must_use]
    pub fn entry(&self, vid: &str) -> Option<VaultEntry> {
        self.tables.read().entries.get(vid).cloned()
    }

    /// Indexed words of `vid`, in insertion order.
    #[must_use]
    pub fn words(&self, vid: &str) -> Vec<String> {
        self.tables.read().words.get(vid).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn nodes(&self) -> Vec<(i64, i64)> {
        self.tables.read().nodes.iter().map(|(id, seen)| (*id, *seen)).collect()
    }

    fn ensure_online(&self) -> Result<(), DatabaseError> {
        if self.faults.offline.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable {
                message: "memory backend is offline".into(),
                context: None,
            });
        }
        Ok(())
    }

    fn ensure_words_writable(&self, words: &[String]) -> Result<(), DatabaseError> {
        if !words.is_empty() && self.faults.word_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable {
                message: "search word insert rejected".into(),
                context: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VaultRepository for MemoryRepository {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.ensure_online()
    }

    async fn find_provider(&self, sid: i64) -> Result<Option<ProviderRecord>, DatabaseError> {
        self.ensure_online()?;
        Ok(self.tables.read().providers.get(&sid).cloned())
    }

    async fn save_provider(&self, record: ProviderRecord) -> Result<(), DatabaseError> {
        self.ensure_online()?;
        self.tables.write().providers.insert(record.sid, record);
        Ok(())
    }

    async fn remove_provider(&self, sid: i64) -> Result<bool, DatabaseError> {
        self.ensure_online()?;
        Ok(self.tables.write().providers.remove(&sid).is_some())
    }

    async fn list_providers(&self) -> Result<Vec<ProviderRecord>, DatabaseError> {
        self.ensure_online()?;
        Ok(self.tables.read().providers.values().cloned().collect())
    }

    async fn insert_entry(
        &self,
        entry: VaultEntry,
        words: Vec<String>,
    ) -> Result<InsertOutcome, DatabaseError> {
        self.ensure_online()?;
        let mut tables = self.tables.write();
        if tables.entries.contains_key(&entry.vid) {
            return Ok(InsertOutcome::Collision);
        }
        self.ensure_words_writable(&words)?;

        if !words.is_empty() {
            tables.words.insert(entry.vid.clone(), words);
        }
        tables.entries.insert(entry.vid.clone(), entry);
        Ok(InsertOutcome::Stored)
    }

    async fn entry_meta(&self, vid: &str, sid: i64) -> Result<Option<EntryMeta>, DatabaseError> {
        self.ensure_online()?;
        Ok(self
            .tables
            .read()
            .entries
            .get(vid)
            .filter(|entry| entry.provider_id == sid)
            .map(|entry| EntryMeta { duration: entry.duration }))
    }

    async fn replace_entry(
        &self,
        sid: i64,
        vid: &str,
        payload: String,
        words: Vec<String>,
    ) -> Result<bool, DatabaseError> {
        self.ensure_online()?;
        self.ensure_words_writable(&words)?;
        let mut tables = self.tables.write();
        let Some(entry) = tables
            .entries
            .get_mut(vid)
            .filter(|entry| entry.provider_id == sid && entry.duration == 0)
        else {
            return Ok(false);
        };
        entry.payload = payload;
        if words.is_empty() {
            tables.words.remove(vid);
        } else {
            tables.words.insert(vid.to_owned(), words);
        }
        Ok(true)
    }

    async fn delete_entries(&self, sid: i64, vids: &[String]) -> Result<usize, DatabaseError> {
        self.ensure_online()?;
        let mut tables = self.tables.write();
        let owned: Vec<&String> = vids
            .iter()
            .filter(|vid| tables.entries.get(vid.as_str()).is_some_and(|e| e.provider_id == sid))
            .collect();
        Ok(owned.into_iter().filter(|vid| tables.drop_entry(vid)).count())
    }

    async fn fetch_private(
        &self,
        sid: i64,
        vids: &[String],
    ) -> Result<Vec<(String, String)>, DatabaseError> {
        self.ensure_online()?;
        let tables = self.tables.read();
        Ok(vids
            .iter()
            .filter_map(|vid| tables.entries.get(vid))
            .filter(|entry| entry.provider_id == sid && entry.duration == 0)
            .map(|entry| (entry.vid.clone(), entry.payload.clone()))
            .collect())
    }

    async fn fetch_published(&self, vids: &[String]) -> Result<Vec<(String, String)>, DatabaseError> {
        self.ensure_online()?;
        let tables = self.tables.read();
        Ok(vids
            .iter()
            .filter_map(|vid| tables.entries.get(vid))
            .filter(|entry| entry.is_published())
            .map(|entry| (entry.vid.clone(), entry.payload.clone()))
            .collect())
    }

    async fn search(&self, sid: i64, words: &[String]) -> Result<Vec<String>, DatabaseError> {
        self.ensure_online()?;
        let tables = self.tables.read();
        let mut found: Vec<String> = tables
            .words
            .iter()
            .filter(|(vid, _)| {
                tables.entries.get(vid.as_str()).is_some_and(|entry| entry.provider_id == sid)
            })
            .filter(|(_, indexed)| {
                words.iter().all(|wanted| indexed.iter().any(|w| w.starts_with(wanted.as_str())))
            })
            .map(|(vid, _)| vid.clone())
            .collect();
        found.sort_unstable();
        Ok(found)
    }

    async fn append_audit(&self, record: AuditRecord) -> Result<(), DatabaseError> {
        self.ensure_online()?;
        self.tables.write().audit.push(record);
        Ok(())
    }

    async fn touch_node(&self, node_id: i64, now: i64) -> Result<(), DatabaseError> {
        self.ensure_online()?;
        self.tables.write().nodes.insert(node_id, now);
        Ok(())
    }

    async fn prune_nodes(&self, cutoff: i64) -> Result<usize, DatabaseError> {
        self.ensure_online()?;
        let mut tables = self.tables.write();
        let before = tables.nodes.len();
        tables.nodes.retain(|_, seen| *seen >= cutoff);
        Ok(before - tables.nodes.len())
    }

    async fn min_node(&self) -> Result<Option<i64>, DatabaseError> {
        self.ensure_online()?;
        Ok(self.tables.read().nodes.keys().next().copied())
    }

    async fn purge_expired(&self, now: i64) -> Result<usize, DatabaseError> {
        self.ensure_online()?;
        let mut tables = self.tables.write();
        let expired: FxHashSet<String> = tables
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.vid.clone())
            .collect();
        for vid in &expired {
            tables.drop_entry(vid);
        }
        Ok(expired.len())
    }
}

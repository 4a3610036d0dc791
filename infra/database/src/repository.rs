use crate::DatabaseError;
use async_trait::async_trait;
use pvault_domain::records::{AuditRecord, EntryMeta, ProviderRecord, VaultEntry};
use std::fmt::Debug;

/// Result of an entry insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Stored,
    /// The `vid` is already taken. Nothing was written.
    Collision,
}

/// Storage seam for every vault table.
///
/// Timestamps are unix seconds supplied by the caller. Multi-table mutations are atomic:
/// a reader never sees an entry with a partially written word set.
#[async_trait]
pub trait VaultRepository: Send + Sync + Debug {
    /// Trivial round trip used by the keep-alive loop and `/ping`.
    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn find_provider(&self, sid: i64) -> Result<Option<ProviderRecord>, DatabaseError>;

    /// Inserts or replaces the provider with the same `sid`.
    async fn save_provider(&self, record: ProviderRecord) -> Result<(), DatabaseError>;

    async fn remove_provider(&self, sid: i64) -> Result<bool, DatabaseError>;

    async fn list_providers(&self) -> Result<Vec<ProviderRecord>, DatabaseError>;

    /// Stores the entry and its (already de-duplicated) words in one transaction.
    async fn insert_entry(
        &self,
        entry: VaultEntry,
        words: Vec<String>,
    ) -> Result<InsertOutcome, DatabaseError>;

    /// Metadata of `vid` if it is owned by `sid`.
    async fn entry_meta(&self, vid: &str, sid: i64) -> Result<Option<EntryMeta>, DatabaseError>;

    /// Replaces payload and word set of the private entry `vid` owned by `sid` in one
    /// transaction. Returns `false` and writes nothing if no such entry exists.
    async fn replace_entry(
        &self,
        sid: i64,
        vid: &str,
        payload: String,
        words: Vec<String>,
    ) -> Result<bool, DatabaseError>;

    /// Deletes the listed entries owned by `sid` with their words. Foreign tokens are skipped.
    async fn delete_entries(&self, sid: i64, vids: &[String]) -> Result<usize, DatabaseError>;

    /// `(vid, payload)` of private entries owned by `sid`.
    async fn fetch_private(
        &self,
        sid: i64,
        vids: &[String],
    ) -> Result<Vec<(String, String)>, DatabaseError>;

    /// `(vid, payload)` of published entries, any owner.
    async fn fetch_published(&self, vids: &[String]) -> Result<Vec<(String, String)>, DatabaseError>;

    /// Entries of `sid` having, for every word, an indexed word starting with it.
    async fn search(&self, sid: i64, words: &[String]) -> Result<Vec<String>, DatabaseError>;

    async fn append_audit(&self, record: AuditRecord) -> Result<(), DatabaseError>;

    async fn touch_node(&self, node_id: i64, now: i64) -> Result<(), DatabaseError>;

    /// Removes nodes whose last activity is older than `cutoff`.
    async fn prune_nodes(&self, cutoff: i64) -> Result<usize, DatabaseError>;

    async fn min_node(&self) -> Result<Option<i64>, DatabaseError>;

    /// Deletes expired published entries and their words.
    async fn purge_expired(&self, now: i64) -> Result<usize, DatabaseError>;
}

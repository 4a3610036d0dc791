use crate::error::{VaultError, VaultErrorExt};
use crate::tokens::{dedupe, generate_token, split_list, validate_search_word, validate_token};
use pvault_audit::AuditLog;
use pvault_database::{InsertOutcome, VaultRepository};
use pvault_domain::constants::{
    MAX_PAYLOAD_BYTES, MAX_PUBLISH_DAYS, MAX_SEARCH_TERMS, MIN_PUBLISH_DAYS, SERVER_VERSION,
    TOKEN_ATTEMPTS,
};
use pvault_domain::capabilities::Capabilities;
use pvault_domain::records::{AuditKind, VaultEntry};
use pvault_kernel::clock::{Clock, format_timestamp};
use std::fmt;
use std::sync::Arc;
use tracing::{error, instrument, warn};

/// Produces candidate tokens. Swappable so collisions can be forced.
pub type TokenSource = Arc<dyn Fn() -> Result<String, VaultError> + Send + Sync>;

/// Result of one requested token in `get`/`getpublished`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub vid: String,
    /// `None` renders as `NOTFOUND`.
    pub payload: Option<String>,
}

/// Answer of the `check` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub time: String,
    pub version: &'static str,
    pub capabilities: Capabilities,
}

/// The vault operations. Every method expects an already authorized `sid`.
#[derive(Clone)]
pub struct VaultService {
    repository: Arc<dyn VaultRepository>,
    audit: AuditLog,
    clock: Arc<dyn Clock>,
    tokens: TokenSource,
}

impl fmt::Debug for VaultService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultService")
            .field("repository", &self.repository)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl VaultService {
    #[must_use]
    pub fn new(repository: Arc<dyn VaultRepository>, audit: AuditLog, clock: Arc<dyn Clock>) -> Self {
        Self { repository, audit, clock, tokens: Arc::new(generate_token) }
    }

    #[must_use]
    pub fn with_token_source(mut self, tokens: TokenSource) -> Self {
        self.tokens = tokens;
        self
    }

    /// Stores a private entry and indexes its words. Returns the new `vid`.
    ///
    /// # Errors
    /// * [`VaultError::MissingParameter`] for an empty payload.
    /// * [`VaultError::InvalidParameterSize`] for a payload over 1 MiB.
    /// * [`VaultError::InvalidEncoding`] for a malformed search word.
    /// * [`VaultError::Internal`]/[`VaultError::Storage`] when storing fails.
    #[instrument(skip(self, payload, words), fields(bytes = payload.len(), words = words.len()))]
    pub async fn add(
        &self,
        sid: i64,
        payload: String,
        words: Vec<String>,
    ) -> Result<String, VaultError> {
        check_payload(&payload)?;
        let words = check_words(words)?;

        let vid = self.store(sid, payload, 0, words).await?;
        self.audit.record(AuditKind::Add, sid, vid.clone());
        Ok(vid)
    }

    /// Stores an entry readable by anyone for `duration_days`. Never indexed.
    ///
    /// # Errors
    /// As [`add`](Self::add), plus [`VaultError::InvalidParameterSize`] for a duration
    /// outside 1..=365.
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn publish(
        &self,
        sid: i64,
        payload: String,
        duration_days: i64,
    ) -> Result<String, VaultError> {
        check_payload(&payload)?;
        if !(MIN_PUBLISH_DAYS..=MAX_PUBLISH_DAYS).contains(&duration_days) {
            return Err(VaultError::size("Duration must be between 1 and 365 days"));
        }

        let vid = self.store(sid, payload, duration_days, Vec::new()).await?;
        self.audit.record(AuditKind::Publish, sid, vid.clone());
        Ok(vid)
    }

    /// Replaces payload and words of a private entry owned by `sid`.
    ///
    /// # Errors
    /// * [`VaultError::NotFound`] for a malformed or foreign `vid`.
    /// * [`VaultError::InvalidForPublished`] for a published entry, whatever the payload.
    /// * Payload and word errors as in [`add`](Self::add).
    #[instrument(skip(self, payload, words), fields(words = words.len()))]
    pub async fn update(
        &self,
        sid: i64,
        vid: &str,
        payload: String,
        words: Vec<String>,
    ) -> Result<(), VaultError> {
        if !validate_token(vid) {
            return Err(VaultError::not_found("Invalid VID"));
        }
        let meta = self
            .repository
            .entry_meta(vid, sid)
            .await
            .context("Loading entry")?
            .ok_or_else(|| VaultError::not_found("Entry with this VID not found"))?;
        if meta.duration != 0 {
            return Err(VaultError::InvalidForPublished { context: None });
        }
        check_payload(&payload)?;
        let words = check_words(words)?;

        let replaced = self
            .repository
            .replace_entry(sid, vid, payload, words)
            .await
            .context("Updating entry")?;
        if !replaced {
            return Err(VaultError::not_found("Entry with this VID not found"));
        }
        self.audit.record(AuditKind::Update, sid, vid);
        Ok(())
    }

    /// Deletes the listed entries of `sid`. Tokens of other tenants are skipped silently.
    ///
    /// # Errors
    /// * [`VaultError::MissingParameter`] for an empty list.
    /// * [`VaultError::NotFound`] if any token is malformed; nothing is deleted then.
    #[instrument(skip(self))]
    pub async fn delete(&self, sid: i64, vid_list: &str) -> Result<usize, VaultError> {
        let vids = parse_vids(vid_list)?;
        let deleted =
            self.repository.delete_entries(sid, &vids).await.context("Deleting entries")?;
        self.audit.record(AuditKind::Delete, sid, vid_list);
        Ok(deleted)
    }

    /// Payloads of private entries owned by `sid`, in request order.
    ///
    /// # Errors
    /// Same list validation as [`delete`](Self::delete).
    #[instrument(skip(self))]
    pub async fn get(&self, sid: i64, vid_list: &str) -> Result<Vec<Lookup>, VaultError> {
        let vids = parse_vids(vid_list)?;
        let found = self.repository.fetch_private(sid, &vids).await.context("Reading entries")?;
        self.audit.record(AuditKind::Get, sid, vid_list);
        Ok(merge_lookups(vids, found))
    }

    /// Payloads of published entries of any tenant. Needs no credentials.
    ///
    /// # Errors
    /// Same list validation as [`delete`](Self::delete).
    #[instrument(skip(self))]
    pub async fn get_published(&self, vid_list: &str) -> Result<Vec<Lookup>, VaultError> {
        let vids = parse_vids(vid_list)?;
        let found =
            self.repository.fetch_published(&vids).await.context("Reading published entries")?;
        self.audit.record(AuditKind::Get, 0, vid_list);
        Ok(merge_lookups(vids, found))
    }

    /// Entries of `sid` matching every word as a prefix.
    ///
    /// # Errors
    /// * [`VaultError::MissingParameter`] without words.
    /// * [`VaultError::InvalidParameterSize`] for more than five distinct words.
    /// * [`VaultError::InvalidEncoding`] for a malformed word.
    #[instrument(skip(self))]
    pub async fn search(&self, sid: i64, words: Vec<String>) -> Result<Vec<String>, VaultError> {
        let words = dedupe(words);
        if words.is_empty() {
            return Err(VaultError::missing("Missing words"));
        }
        if words.len() > MAX_SEARCH_TERMS {
            return Err(VaultError::size("Too many search words"));
        }
        if !words.iter().all(|w| validate_search_word(w)) {
            return Err(VaultError::encoding("Invalid search word encoding"));
        }

        self.repository.search(sid, &words).await.context("Searching words")
    }

    /// Capability announcement. Touches no storage.
    #[must_use]
    pub fn check(&self) -> CheckReport {
        CheckReport {
            time: format_timestamp(self.clock.now()),
            version: SERVER_VERSION,
            capabilities: Capabilities::ALL,
        }
    }

    /// Inserts under a fresh token, retrying collisions up to [`TOKEN_ATTEMPTS`] times.
    async fn store(
        &self,
        sid: i64,
        payload: String,
        duration: i64,
        words: Vec<String>,
    ) -> Result<String, VaultError> {
        let creation_date = self.clock.now();
        for attempt in 1..=TOKEN_ATTEMPTS {
            let vid = (self.tokens)()?;
            let entry = VaultEntry {
                vid: vid.clone(),
                payload: payload.clone(),
                provider_id: sid,
                creation_date,
                duration,
            };
            match self.repository.insert_entry(entry, words.clone()).await.context("Storing payload")? {
                InsertOutcome::Stored => return Ok(vid),
                InsertOutcome::Collision => warn!(attempt, "Token collision, retrying"),
            }
        }

        error!(sid, attempts = TOKEN_ATTEMPTS, "Failed unique VID generation");
        Err(VaultError::Internal {
            message: format!("no unique VID after {TOKEN_ATTEMPTS} attempts").into(),
            context: Some("Storing payload".into()),
        })
    }
}

fn check_payload(payload: &str) -> Result<(), VaultError> {
    if payload.is_empty() {
        return Err(VaultError::missing("Missing data"));
    }
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(VaultError::size("Data bigger than 1MB"));
    }
    Ok(())
}

fn check_words(words: Vec<String>) -> Result<Vec<String>, VaultError> {
    let words = dedupe(words);
    if words.iter().all(|w| validate_search_word(w)) {
        Ok(words)
    } else {
        Err(VaultError::encoding("Invalid search word encoding"))
    }
}

fn parse_vids(vid_list: &str) -> Result<Vec<String>, VaultError> {
    if vid_list.is_empty() {
        return Err(VaultError::missing("No VID?"));
    }
    let vids = dedupe(split_list(vid_list));
    if let Some(bad) = vids.iter().find(|vid| !validate_token(vid)) {
        return Err(VaultError::not_found(format!("Invalid VID {bad}")));
    }
    Ok(vids)
}

fn merge_lookups(requested: Vec<String>, found: Vec<(String, String)>) -> Vec<Lookup> {
    let mut found: fxhash::FxHashMap<String, String> = found.into_iter().collect();
    requested
        .into_iter()
        .map(|vid| {
            let payload = found.remove(&vid);
            Lookup { vid, payload }
        })
        .collect()
}

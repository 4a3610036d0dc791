use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::repository::{InsertOutcome, VaultRepository};
use crate::schema::{ENTRY_MISSING, SCHEMA, UNIQUE_VIOLATION};
use async_trait::async_trait;
use pvault_domain::constants::SECONDS_PER_DAY;
use pvault_domain::records::{AuditRecord, EntryMeta, ProviderRecord, VaultEntry};
use std::fmt::Write;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use surrealdb::types::SurrealValue;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, instrument, warn};

/// Inner state of the [`Database`] wrapper.
#[derive(Debug)]
pub struct DatabaseInner {
    instance: Surreal<Any>,
    ns: String,
    db: String,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        info!(ns = %self.ns, db = %self.db, "SurrealDB session handle dropped");
    }
}

/// `SurrealDB` client wrapper with the vault schema applied.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates a new [`DatabaseBuilder`].
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }
}

impl Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.inner.instance
    }
}

/// A fluent builder for configuring and establishing a `SurrealDB` connection.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    url: Option<String>,
    ns: Option<String>,
    db: Option<String>,
    auth: Option<(String, String)>,
}

impl DatabaseBuilder {
    /// Creates a new [`DatabaseBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the namespace and database name.
    pub fn session(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.ns = Some(namespace.into());
        self.db = Some(database.into());
        self
    }

    /// Add root credentials to the connection.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Consumes the builder and establishes the connection.
    ///
    /// # Process
    /// 1. **Validation**: Ensures URL, Namespace, and Database name are provided.
    /// 2. **Engine Initialization**: Connects to the underlying `SurrealDB` engine (Any).
    /// 3. **Resilience**: Up to 3 health checks with exponential backoff (starting at 500ms).
    /// 4. **Authentication**: If credentials were provided via [`auth`](Self::auth), signs in as Root.
    /// 5. **Session Activation**: Sets the namespace and database for the connection.
    /// 6. **Schema**: Defines the vault tables and unique indexes if they are missing.
    ///
    /// # Errors
    /// * [`DatabaseError::Validation`] if required parameters are missing.
    /// * [`DatabaseError::Connection`] if the engine fails to start or remains unhealthy.
    /// * [`DatabaseError::Auth`] if the provided credentials are rejected.
    /// * [`DatabaseError::Surreal`] if session activation fails.
    /// * [`DatabaseError::Schema`] if the schema cannot be applied.
    #[instrument(skip(self), fields(url = self.url, ns = self.ns, db = self.db))]
    pub async fn init(self) -> Result<Database, DatabaseError> {
        let url = self.url.ok_or(DatabaseError::Validation {
            message: "URL is required".into(),
            context: None,
        })?;
        let ns = self.ns.ok_or(DatabaseError::Validation {
            message: "Namespace is required".into(),
            context: None,
        })?;
        let db = self.db.ok_or(DatabaseError::Validation {
            message: "Database is required".into(),
            context: None,
        })?;

        let instance = connect(&url).await.map_err(|e| DatabaseError::Connection {
            message: e.to_string().into(),
            context: Some("Initializing engine".into()),
        })?;

        let mut delay = Duration::from_millis(500);
        for attempt in 1..=3 {
            if instance.health().await.is_ok() {
                break;
            }
            if attempt == 3 {
                return Err(DatabaseError::Connection {
                    message: "Unhealthy after retries".into(),
                    context: Some(url.into()),
                });
            }
            warn!(attempt, ?delay, "Database not ready, retrying...");
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        if let Some((u, p)) = self.auth {
            instance.signin(Root { username: u, password: p }).await.map_err(|e| {
                DatabaseError::Auth { message: e.to_string().into(), context: Some(url.into()) }
            })?;
        }

        instance.use_ns(&ns).use_db(&db).await.context("Activating session")?;

        let version =
            instance.version().await.map_or_else(|_| "unknown".to_owned(), |v| v.to_string());
        info!(namespace = %ns, database = %db, %version, "SurrealDB connection established");

        instance
            .query(SCHEMA)
            .await
            .context("Applying vault schema")?
            .check()
            .map_err(|e| DatabaseError::Schema {
                message: e.to_string().into(),
                context: Some("Defining vault tables".into()),
            })?;
        debug!("Vault schema applied");

        Ok(Database { inner: Arc::new(DatabaseInner { instance, ns, db }) })
    }
}

#[derive(Debug, SurrealValue)]
struct ProviderRow {
    sid: i64,
    password: String,
    allowed_ip: String,
    name: String,
    description: String,
    creation_date: i64,
}

impl From<ProviderRow> for ProviderRecord {
    fn from(row: ProviderRow) -> Self {
        Self {
            sid: row.sid,
            password: row.password,
            allowed_ip: row.allowed_ip,
            name: row.name,
            description: row.description,
            creation_date: row.creation_date,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct PayloadRow {
    vid: String,
    payload: String,
}

const PROVIDER_FIELDS: &str = "sid, password, allowed_ip, name, description, creation_date";

/// [`VaultRepository`] backed by `SurrealDB`.
///
/// Concurrency is bounded by a semaphore; a permit is held for one operation only.
#[derive(Debug, Clone)]
pub struct SurrealRepository {
    db: Database,
    permits: Arc<Semaphore>,
}

impl SurrealRepository {
    #[must_use]
    pub fn new(db: Database, max_connections: usize) -> Self {
        Self { db, permits: Arc::new(Semaphore::new(max_connections.max(1))) }
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>, DatabaseError> {
        self.permits.acquire().await.map_err(|e| DatabaseError::Unavailable {
            message: e.to_string().into(),
            context: Some("Connection pool closed".into()),
        })
    }

    async fn owned_vids(&self, sid: i64, vids: &[String]) -> Result<Vec<String>, DatabaseError> {
        let owned = self
            .db
            .query("SELECT VALUE vid FROM vault_entry WHERE provider_id = $sid AND vid IN $vids")
            .bind(("sid", sid))
            .bind(("vids", vids.to_vec()))
            .await
            .context("Selecting owned entries")?
            .take::<Vec<String>>(0)?;
        Ok(owned)
    }
}

/// Conjunctive prefix query, one subselect per bound word (`$w0`, `$w1`, ...).
fn search_query(word_count: usize) -> String {
    let mut query =
        String::from("SELECT VALUE vid FROM vault_entry WHERE provider_id = $sid");
    for i in 0..word_count {
        let _ = write!(
            query,
            " AND vid IN (SELECT VALUE vid FROM search_word WHERE string::starts_with(word, $w{i}))"
        );
    }
    query
}

/// Ownership and `duration = 0` are re-checked inside the transaction; the guard is the
/// first statement so its error is the one reported.
fn replace_query() -> String {
    format!(
        "BEGIN TRANSACTION;
        IF array::len((SELECT VALUE vid FROM vault_entry
            WHERE vid = $vid AND provider_id = $sid AND duration = 0)) = 0 {{
            THROW \"{ENTRY_MISSING}\";
        }};
        DELETE search_word WHERE vid = $vid;
        UPDATE vault_entry SET payload = $payload
            WHERE vid = $vid AND provider_id = $sid AND duration = 0;
        FOR $word IN $words {{ CREATE search_word SET vid = $vid, word = $word; }};
        COMMIT TRANSACTION;"
    )
}

fn is_unique_violation(err: &impl std::fmt::Display) -> bool {
    err.to_string().contains(UNIQUE_VIOLATION)
}

fn is_missing_entry(err: &impl std::fmt::Display) -> bool {
    err.to_string().contains(ENTRY_MISSING)
}

#[async_trait]
impl VaultRepository for SurrealRepository {
    async fn ping(&self) -> Result<(), DatabaseError> {
        let _permit = self.permit().await?;
        self.db
            .query("RETURN true")
            .await
            .context("Keep-alive query")?
            .take::<Option<bool>>(0)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_provider(&self, sid: i64) -> Result<Option<ProviderRecord>, DatabaseError> {
        let _permit = self.permit().await?;
        let query = format!("SELECT {PROVIDER_FIELDS} FROM provider WHERE sid = $sid LIMIT 1");
        let rows = self
            .db
            .query(&query)
            .bind(("sid", sid))
            .await
            .context("Loading provider")?
            .take::<Vec<ProviderRow>>(0)?;
        Ok(rows.into_iter().next().map(ProviderRecord::from))
    }

    #[instrument(skip_all, fields(sid = record.sid))]
    async fn save_provider(&self, record: ProviderRecord) -> Result<(), DatabaseError> {
        let _permit = self.permit().await?;
        self.db
            .query(
                "BEGIN TRANSACTION;
                DELETE provider WHERE sid = $sid;
                CREATE provider SET sid = $sid, password = $password, allowed_ip = $allowed_ip,
                    name = $name, description = $description, creation_date = $creation_date;
                COMMIT TRANSACTION;",
            )
            .bind(("sid", record.sid))
            .bind(("password", record.password))
            .bind(("allowed_ip", record.allowed_ip))
            .bind(("name", record.name))
            .bind(("description", record.description))
            .bind(("creation_date", record.creation_date))
            .await
            .context("Saving provider")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_provider(&self, sid: i64) -> Result<bool, DatabaseError> {
        let existed = self.find_provider(sid).await?.is_some();
        let _permit = self.permit().await?;
        self.db
            .query("DELETE provider WHERE sid = $sid")
            .bind(("sid", sid))
            .await
            .context("Removing provider")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(existed)
    }

    async fn list_providers(&self) -> Result<Vec<ProviderRecord>, DatabaseError> {
        let _permit = self.permit().await?;
        let query = format!("SELECT {PROVIDER_FIELDS} FROM provider ORDER BY sid");
        let rows = self
            .db
            .query(&query)
            .await
            .context("Listing providers")?
            .take::<Vec<ProviderRow>>(0)?;
        Ok(rows.into_iter().map(ProviderRecord::from).collect())
    }

    #[instrument(skip_all, fields(vid = %entry.vid, sid = entry.provider_id, words = words.len()))]
    async fn insert_entry(
        &self,
        entry: VaultEntry,
        words: Vec<String>,
    ) -> Result<InsertOutcome, DatabaseError> {
        let _permit = self.permit().await?;
        let taken = self
            .db
            .query("SELECT VALUE vid FROM vault_entry WHERE vid = $vid LIMIT 1")
            .bind(("vid", entry.vid.clone()))
            .await
            .context("Checking token")?
            .take::<Vec<String>>(0)?;
        if !taken.is_empty() {
            return Ok(InsertOutcome::Collision);
        }

        let response = self
            .db
            .query(
                "BEGIN TRANSACTION;
                CREATE vault_entry SET vid = $vid, payload = $payload, provider_id = $sid,
                    creation_date = $created, duration = $duration;
                FOR $word IN $words { CREATE search_word SET vid = $vid, word = $word; };
                COMMIT TRANSACTION;",
            )
            .bind(("vid", entry.vid))
            .bind(("payload", entry.payload))
            .bind(("sid", entry.provider_id))
            .bind(("created", entry.creation_date))
            .bind(("duration", entry.duration))
            .bind(("words", words))
            .await
            .context("Storing entry")?;

        match response.check() {
            Ok(_) => Ok(InsertOutcome::Stored),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Collision),
            Err(e) => Err(surrealdb::Error::from(e).into()),
        }
    }

    async fn entry_meta(&self, vid: &str, sid: i64) -> Result<Option<EntryMeta>, DatabaseError> {
        let _permit = self.permit().await?;
        let durations = self
            .db
            .query("SELECT VALUE duration FROM vault_entry WHERE vid = $vid AND provider_id = $sid")
            .bind(("vid", vid.to_owned()))
            .bind(("sid", sid))
            .await
            .context("Loading entry metadata")?
            .take::<Vec<i64>>(0)?;
        Ok(durations.into_iter().next().map(|duration| EntryMeta { duration }))
    }

    #[instrument(skip(self, payload, words), fields(words = words.len()))]
    async fn replace_entry(
        &self,
        sid: i64,
        vid: &str,
        payload: String,
        words: Vec<String>,
    ) -> Result<bool, DatabaseError> {
        let _permit = self.permit().await?;
        let statement = replace_query();
        let response = self
            .db
            .query(&statement)
            .bind(("sid", sid))
            .bind(("vid", vid.to_owned()))
            .bind(("payload", payload))
            .bind(("words", words))
            .await
            .context("Replacing entry")?;

        match response.check() {
            Ok(_) => Ok(true),
            Err(e) if is_missing_entry(&e) => Ok(false),
            Err(e) => Err(surrealdb::Error::from(e).into()),
        }
    }

    #[instrument(skip(self))]
    async fn delete_entries(&self, sid: i64, vids: &[String]) -> Result<usize, DatabaseError> {
        let _permit = self.permit().await?;
        let owned = self.owned_vids(sid, vids).await?;
        if owned.is_empty() {
            return Ok(0);
        }
        let count = owned.len();
        self.db
            .query(
                "BEGIN TRANSACTION;
                DELETE search_word WHERE vid IN
                    (SELECT VALUE vid FROM vault_entry WHERE provider_id = $sid AND vid IN $vids);
                DELETE vault_entry WHERE provider_id = $sid AND vid IN $vids;
                COMMIT TRANSACTION;",
            )
            .bind(("sid", sid))
            .bind(("vids", owned))
            .await
            .context("Deleting entries")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(count)
    }

    async fn fetch_private(
        &self,
        sid: i64,
        vids: &[String],
    ) -> Result<Vec<(String, String)>, DatabaseError> {
        let _permit = self.permit().await?;
        let rows = self
            .db
            .query(
                "SELECT vid, payload FROM vault_entry
                WHERE vid IN $vids AND provider_id = $sid AND duration = 0",
            )
            .bind(("vids", vids.to_vec()))
            .bind(("sid", sid))
            .await
            .context("Fetching private entries")?
            .take::<Vec<PayloadRow>>(0)?;
        Ok(rows.into_iter().map(|row| (row.vid, row.payload)).collect())
    }

    async fn fetch_published(&self, vids: &[String]) -> Result<Vec<(String, String)>, DatabaseError> {
        let _permit = self.permit().await?;
        let rows = self
            .db
            .query("SELECT vid, payload FROM vault_entry WHERE vid IN $vids AND duration > 0")
            .bind(("vids", vids.to_vec()))
            .await
            .context("Fetching published entries")?
            .take::<Vec<PayloadRow>>(0)?;
        Ok(rows.into_iter().map(|row| (row.vid, row.payload)).collect())
    }

    #[instrument(skip(self))]
    async fn search(&self, sid: i64, words: &[String]) -> Result<Vec<String>, DatabaseError> {
        let _permit = self.permit().await?;
        let statement = search_query(words.len());
        let mut query = self.db.query(&statement).bind(("sid", sid));
        for (i, word) in words.iter().enumerate() {
            query = query.bind((format!("w{i}"), word.clone()));
        }
        let mut vids = query.await.context("Searching words")?.take::<Vec<String>>(0)?;
        vids.sort_unstable();
        Ok(vids)
    }

    async fn append_audit(&self, record: AuditRecord) -> Result<(), DatabaseError> {
        let _permit = self.permit().await?;
        self.db
            .query(
                "CREATE audit SET log_type = $log_type, kind = $kind, provider_id = $sid,
                    message = $message, log_date = $log_date",
            )
            .bind(("log_type", record.kind.code()))
            .bind(("kind", record.kind.as_str()))
            .bind(("sid", record.provider_id))
            .bind(("message", record.message))
            .bind(("log_date", record.log_date))
            .await
            .context("Writing audit record")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    async fn touch_node(&self, node_id: i64, now: i64) -> Result<(), DatabaseError> {
        let _permit = self.permit().await?;
        self.db
            .query(
                "BEGIN TRANSACTION;
                DELETE cluster_node WHERE node_id = $node;
                CREATE cluster_node SET node_id = $node, last_activity = $now;
                COMMIT TRANSACTION;",
            )
            .bind(("node", node_id))
            .bind(("now", now))
            .await
            .context("Registering node")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    async fn prune_nodes(&self, cutoff: i64) -> Result<usize, DatabaseError> {
        let _permit = self.permit().await?;
        let stale = self
            .db
            .query("SELECT VALUE node_id FROM cluster_node WHERE last_activity < $cutoff")
            .bind(("cutoff", cutoff))
            .await
            .context("Selecting stale nodes")?
            .take::<Vec<i64>>(0)?;
        if stale.is_empty() {
            return Ok(0);
        }
        self.db
            .query("DELETE cluster_node WHERE node_id IN $stale")
            .bind(("stale", stale.clone()))
            .await
            .context("Pruning stale nodes")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(stale.len())
    }

    async fn min_node(&self) -> Result<Option<i64>, DatabaseError> {
        let _permit = self.permit().await?;
        let lowest = self
            .db
            .query("SELECT VALUE node_id FROM cluster_node ORDER BY node_id ASC LIMIT 1")
            .await
            .context("Electing node")?
            .take::<Vec<i64>>(0)?;
        Ok(lowest.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self, now: i64) -> Result<usize, DatabaseError> {
        let _permit = self.permit().await?;
        let expired = self
            .db
            .query(
                "SELECT VALUE vid FROM vault_entry
                WHERE duration > 0 AND $now - creation_date > duration * $day",
            )
            .bind(("now", now))
            .bind(("day", SECONDS_PER_DAY))
            .await
            .context("Selecting expired entries")?
            .take::<Vec<String>>(0)?;
        if expired.is_empty() {
            return Ok(0);
        }
        let count = expired.len();
        self.db
            .query(
                "BEGIN TRANSACTION;
                DELETE search_word WHERE vid IN (SELECT VALUE vid FROM vault_entry
                    WHERE vid IN $expired AND duration > 0 AND $now - creation_date > duration * $day);
                DELETE vault_entry
                    WHERE vid IN $expired AND duration > 0 AND $now - creation_date > duration * $day;
                COMMIT TRANSACTION;",
            )
            .bind(("expired", expired))
            .bind(("now", now))
            .bind(("day", SECONDS_PER_DAY))
            .await
            .context("Purging expired entries")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_binds_one_parameter_per_word() {
        let query = search_query(2);
        assert!(query.contains("$w0"));
        assert!(query.contains("$w1"));
        assert!(!query.contains("$w2"));
        assert_eq!(query.matches("string::starts_with").count(), 2);
    }

    #[test]
    fn unique_violation_is_detected_from_message() {
        assert!(is_unique_violation(&"Database index `vault_entry_vid` already contains 'x'"));
        assert!(!is_unique_violation(&"Connection reset"));
    }

    #[test]
    fn replace_query_guards_owner_and_duration() {
        let query = replace_query();
        let guard = query.find("THROW").expect("guard statement");
        assert!(guard < query.find("DELETE search_word").expect("word delete"));
        assert!(query.contains(&format!("THROW \"{ENTRY_MISSING}\"")));
        assert!(is_missing_entry(&format!("An error occurred: {ENTRY_MISSING}")));
    }
}

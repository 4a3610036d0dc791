/// Idempotent schema applied on every connect.
pub(crate) const SCHEMA: &str = "
DEFINE TABLE IF NOT EXISTS provider SCHEMALESS;
DEFINE INDEX IF NOT EXISTS provider_sid ON provider FIELDS sid UNIQUE;

DEFINE TABLE IF NOT EXISTS vault_entry SCHEMALESS;
DEFINE INDEX IF NOT EXISTS vault_entry_vid ON vault_entry FIELDS vid UNIQUE;
DEFINE INDEX IF NOT EXISTS vault_entry_owner ON vault_entry FIELDS provider_id;
DEFINE INDEX IF NOT EXISTS vault_entry_duration ON vault_entry FIELDS duration;

DEFINE TABLE IF NOT EXISTS search_word SCHEMALESS;
DEFINE INDEX IF NOT EXISTS search_word_vid ON search_word FIELDS vid;

DEFINE TABLE IF NOT EXISTS cluster_node SCHEMALESS;
DEFINE INDEX IF NOT EXISTS cluster_node_id ON cluster_node FIELDS node_id UNIQUE;

DEFINE TABLE IF NOT EXISTS audit SCHEMALESS;
";

/// Error text `SurrealDB` reports for a unique index violation.
pub(crate) const UNIQUE_VIOLATION: &str = "already contains";

/// Thrown by a replace whose target is gone, foreign or published.
pub(crate) const ENTRY_MISSING: &str = "pvault_entry_missing";

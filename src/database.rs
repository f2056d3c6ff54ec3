//! Database initialization, shared state and record persistence
//!
//! Styles and history live in an embedded redb file. Values are JSON strings;
//! secondary index tables use composite keys so range scans return records
//! in creation order.

use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use thiserror::Error;

use crate::config::Config;
use crate::model::{HistoryRecord, StyleRecord};
use crate::providers::ProviderRegistry;
use crate::rate_limit::{InMemoryUsageStore, UsageStore};

/// Style records by id
///
/// Key: style id, Value: JSON-serialized StyleRecord
pub const TABLE_STYLES: TableDefinition<&str, &str> = TableDefinition::new("styles_v1");

/// Public styles ordered by creation time
///
/// Key: "{created_at_micros:020}:{id}", Value: JSON-serialized StyleRecord
pub const TABLE_PUBLIC_STYLES: TableDefinition<&str, &str> =
    TableDefinition::new("public_styles_v1");

/// Transformation history per user
///
/// Key: "{user_id_len:05}:{user_id}:{created_at_micros:020}:{id}", Value:
/// JSON-serialized HistoryRecord. The length prefix pins the user segment, so
/// no user's key range can contain another user's records whatever
/// characters the ids hold. The zero-padded timestamp keeps lexicographic
/// order chronological.
pub const TABLE_HISTORY: TableDefinition<&str, &str> = TableDefinition::new("history_v2");

/// Maximum number of public styles returned by one listing
pub const PUBLIC_STYLE_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::Error),
    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("record encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub usage: Arc<dyn UsageStore>,
    pub providers: Arc<ProviderRegistry>,
}

impl AppState {
    /// State with the in-memory usage store and the default vendor adapters
    pub fn new(db: Database, config: Config) -> Self {
        let usage = Arc::new(InMemoryUsageStore::new(config.free_daily_limit));
        let providers = Arc::new(ProviderRegistry::with_defaults(config.provider_timeout));
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            usage,
            providers,
        }
    }

    pub fn with_providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = Arc::new(providers);
        self
    }

    pub fn with_usage_store(mut self, usage: Arc<dyn UsageStore>) -> Self {
        self.usage = usage;
        self
    }
}

/// Creates or opens the database file and makes sure every table exists
///
/// # Example
///
/// ```no_run
/// # use ai_disguise::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_STYLES)?;
        write_txn.open_table(TABLE_PUBLIC_STYLES)?;
        write_txn.open_table(TABLE_HISTORY)?;
    }
    write_txn.commit()?;

    Ok(db)
}

fn public_style_key(style: &StyleRecord) -> String {
    format!("{:020}:{}", style.created_at.timestamp_micros().max(0), style.id)
}

fn history_prefix(user_id: &str) -> String {
    format!("{:05}:{}:", user_id.len(), user_id)
}

fn history_key(user_id: &str, record: &HistoryRecord) -> String {
    let micros = record
        .created_at
        .map(|t| t.timestamp_micros().max(0))
        .unwrap_or(0);
    format!("{}{:020}:{}", history_prefix(user_id), micros, record.id)
}

/// Stores a style; returns `false` without writing when the id is taken
pub fn insert_style(db: &Database, style: &StyleRecord) -> Result<bool, StoreError> {
    let json = serde_json::to_string(style)?;

    let write_txn = db.begin_write()?;
    {
        let mut styles = write_txn.open_table(TABLE_STYLES)?;
        if styles.get(style.id.as_str())?.is_some() {
            return Ok(false);
        }
        styles.insert(style.id.as_str(), json.as_str())?;

        if style.is_public {
            let mut public = write_txn.open_table(TABLE_PUBLIC_STYLES)?;
            public.insert(public_style_key(style).as_str(), json.as_str())?;
        }
    }
    write_txn.commit()?;

    Ok(true)
}

/// Public styles, newest first, at most [`PUBLIC_STYLE_LIMIT`]
pub fn list_public_styles(db: &Database) -> Result<Vec<StyleRecord>, StoreError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_PUBLIC_STYLES)?;

    let mut styles = Vec::new();
    for entry in table.iter()?.rev().take(PUBLIC_STYLE_LIMIT) {
        let (_, value) = entry?;
        match serde_json::from_str::<StyleRecord>(value.value()) {
            Ok(style) => styles.push(style),
            Err(err) => tracing::warn!("skipping unreadable style record: {}", err),
        }
    }
    Ok(styles)
}

pub fn insert_history(
    db: &Database,
    user_id: &str,
    record: &HistoryRecord,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(record)?;
    let key = history_key(user_id, record);

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_HISTORY)?;
        table.insert(key.as_str(), json.as_str())?;
    }
    write_txn.commit()?;

    Ok(())
}

/// One page of a user's history, newest first
pub fn list_history(
    db: &Database,
    user_id: &str,
    offset: usize,
    limit: usize,
) -> Result<Vec<HistoryRecord>, StoreError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_HISTORY)?;

    // every key in prefix .. prefix + "{" starts with the prefix; '{' sorts after digits
    let start_key = history_prefix(user_id);
    let end_key = format!("{}{{", start_key);

    let mut records = Vec::new();
    for entry in table
        .range(start_key.as_str()..end_key.as_str())?
        .rev()
        .skip(offset)
        .take(limit)
    {
        let (_, value) = entry?;
        if let Ok(record) = serde_json::from_str::<HistoryRecord>(value.value()) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Every history record of a user, oldest first
pub fn all_history(db: &Database, user_id: &str) -> Result<Vec<HistoryRecord>, StoreError> {
    let mut records = list_history(db, user_id, 0, usize::MAX)?;
    records.reverse();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::NamedTempFile;

    fn record(id: &str, original: &str, minute: u32) -> HistoryRecord {
        HistoryRecord {
            id: id.to_string(),
            original: original.to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn history_ranges_do_not_overlap_between_users() {
        let temp_db = NamedTempFile::new().unwrap();
        let db = init_db(temp_db.path().to_str().unwrap()).unwrap();

        insert_history(&db, "alice", &record("a1", "alice's note", 1)).unwrap();
        insert_history(&db, "alice:bob", &record("b1", "secret of alice:bob", 2)).unwrap();
        insert_history(&db, "alice0", &record("c1", "alice0's note", 3)).unwrap();
        insert_history(&db, "ali", &record("d1", "ali's note", 4)).unwrap();

        let originals = |user: &str| -> Vec<String> {
            all_history(&db, user)
                .unwrap()
                .into_iter()
                .map(|r| r.original)
                .collect()
        };

        assert_eq!(originals("alice"), vec!["alice's note"]);
        assert_eq!(originals("alice:bob"), vec!["secret of alice:bob"]);
        assert_eq!(originals("alice0"), vec!["alice0's note"]);
        assert_eq!(originals("ali"), vec!["ali's note"]);
        assert!(originals("bob").is_empty());
    }

    #[test]
    fn history_pages_newest_first() {
        let temp_db = NamedTempFile::new().unwrap();
        let db = init_db(temp_db.path().to_str().unwrap()).unwrap();

        for minute in 1..=3 {
            let r = record(&format!("r{}", minute), &format!("m{}", minute), minute);
            insert_history(&db, "u", &r).unwrap();
        }

        let page = list_history(&db, "u", 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].original, "m2");
        assert!(list_history(&db, "u", usize::MAX, 10).unwrap().is_empty());
    }
}

// 🗄️ Generation history - SQLite + WAL
// Stores generator requests (never the generated numbers) per opaque user id.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use crate::template::DEFAULT_CARD_LEN;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::info;

/// One saved generator request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Stable identity (UUID v4)
    pub id: String,
    pub user_id: String,
    pub bin: String,
    pub month: String,
    pub year: String,
    /// Empty when the codes were random
    pub security_code: String,
    pub quantity: i64,
    /// Card length the batch was generated at
    pub target_length: i64,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
}

fn default_target_length() -> i64 {
    DEFAULT_CARD_LEN as i64
}

/// Fields supplied by the caller when saving a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub bin: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub security_code: String,
    pub quantity: i64,
    #[serde(default = "default_target_length")]
    pub target_length: i64,
}

impl Default for NewHistoryEntry {
    fn default() -> Self {
        NewHistoryEntry {
            bin: String::new(),
            month: String::new(),
            year: String::new(),
            security_code: String::new(),
            quantity: 0,
            target_length: default_target_length(),
        }
    }
}

// ============================================================================
// STORE INTERFACE
// ============================================================================

/// Keyed CRUD over a per-user collection
pub trait HistoryStore {
    /// Newest first, at most `limit` entries
    fn list(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>>;

    fn create(&self, user_id: &str, entry: &NewHistoryEntry) -> Result<HistoryEntry>;

    /// New favourite flag, or `None` when the entry isn't the user's
    fn toggle_favorite(&self, user_id: &str, id: &str) -> Result<Option<bool>>;

    /// Whether an entry owned by the user was removed
    fn delete(&self, user_id: &str, id: &str) -> Result<bool>;

    /// Number of entries removed
    fn clear(&self, user_id: &str) -> Result<usize>;
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL is a no-op for in-memory databases
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS card_history (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            bin TEXT NOT NULL,
            month TEXT NOT NULL,
            year TEXT NOT NULL,
            security_code TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            target_length INTEGER NOT NULL DEFAULT 16
        )",
        [],
    )?;

    // Databases created before target_length was recorded
    if !has_column(conn, "card_history", "target_length")? {
        conn.execute(
            "ALTER TABLE card_history ADD COLUMN target_length INTEGER NOT NULL DEFAULT 16",
            [],
        )?;
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_history_user_time ON card_history(user_id, created_at)",
        [],
    )?;

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

/// Open (or create) the history database at `path`
pub fn open_database(path: &std::path::Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open history database {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let created_at_str: String = row.get(8)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(HistoryEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bin: row.get(2)?,
        month: row.get(3)?,
        year: row.get(4)?,
        security_code: row.get(5)?,
        quantity: row.get(6)?,
        is_favorite: row.get::<_, i64>(7)? != 0,
        created_at,
        target_length: row.get(9)?,
    })
}

impl HistoryStore for Connection {
    fn list(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.prepare(
            "SELECT id, user_id, bin, month, year, security_code, quantity, is_favorite, created_at,
                    target_length
             FROM card_history
             WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;

        let entries = stmt
            .query_map(params![user_id, limit as i64], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn create(&self, user_id: &str, entry: &NewHistoryEntry) -> Result<HistoryEntry> {
        let saved = HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            bin: entry.bin.clone(),
            month: entry.month.clone(),
            year: entry.year.clone(),
            security_code: entry.security_code.clone(),
            quantity: entry.quantity,
            target_length: entry.target_length,
            is_favorite: false,
            created_at: Utc::now(),
        };

        self.execute(
            "INSERT INTO card_history (
                id, user_id, bin, month, year, security_code, quantity, is_favorite, created_at,
                target_length
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
            params![
                saved.id,
                saved.user_id,
                saved.bin,
                saved.month,
                saved.year,
                saved.security_code,
                saved.quantity,
                saved.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                saved.target_length,
            ],
        )
        .context("Failed to insert history entry")?;

        info!(user = user_id, id = %saved.id, bin = %saved.bin, "history entry saved");
        Ok(saved)
    }

    fn toggle_favorite(&self, user_id: &str, id: &str) -> Result<Option<bool>> {
        let current: Option<i64> = self
            .query_row(
                "SELECT is_favorite FROM card_history WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(current) = current else {
            return Ok(None);
        };

        let next = current == 0;
        self.execute(
            "UPDATE card_history SET is_favorite = ?1 WHERE id = ?2 AND user_id = ?3",
            params![next as i64, id, user_id],
        )?;

        info!(user = user_id, id, favorite = next, "history favourite toggled");
        Ok(Some(next))
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        let removed = self.execute(
            "DELETE FROM card_history WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        info!(user = user_id, id, removed, "history entry deleted");
        Ok(removed > 0)
    }

    fn clear(&self, user_id: &str) -> Result<usize> {
        let removed = self.execute(
            "DELETE FROM card_history WHERE user_id = ?1",
            params![user_id],
        )?;
        info!(user = user_id, removed, "history cleared");
        Ok(removed)
    }
}

// ============================================================================
// SORTING, FILTERING, STATS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistorySort {
    #[default]
    DateDesc,
    DateAsc,
    BinAsc,
    BinDesc,
    QuantityDesc,
}

impl HistorySort {
    pub const ALL: [HistorySort; 5] = [
        HistorySort::DateDesc,
        HistorySort::DateAsc,
        HistorySort::BinAsc,
        HistorySort::BinDesc,
        HistorySort::QuantityDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HistorySort::DateDesc => "date-desc",
            HistorySort::DateAsc => "date-asc",
            HistorySort::BinAsc => "bin-asc",
            HistorySort::BinDesc => "bin-desc",
            HistorySort::QuantityDesc => "quantity-desc",
        }
    }

    pub fn next(&self) -> Self {
        let i = HistorySort::ALL.iter().position(|s| s == self).unwrap_or(0);
        HistorySort::ALL[(i + 1) % HistorySort::ALL.len()]
    }

    fn compare(&self, a: &HistoryEntry, b: &HistoryEntry) -> Ordering {
        match self {
            HistorySort::DateDesc => b.created_at.cmp(&a.created_at),
            HistorySort::DateAsc => a.created_at.cmp(&b.created_at),
            HistorySort::BinAsc => a.bin.cmp(&b.bin),
            HistorySort::BinDesc => b.bin.cmp(&a.bin),
            HistorySort::QuantityDesc => b.quantity.cmp(&a.quantity),
        }
    }
}

impl FromStr for HistorySort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        HistorySort::ALL
            .iter()
            .copied()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown sort order {s:?}"))
    }
}

/// Stable sort in place
pub fn sort_entries(entries: &mut [HistoryEntry], sort: HistorySort) {
    entries.sort_by(|a, b| sort.compare(a, b));
}

pub fn favorites(entries: &[HistoryEntry]) -> Vec<HistoryEntry> {
    entries.iter().filter(|e| e.is_favorite).cloned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Sum of requested quantities
    pub total_generated: i64,
    /// Number of saved requests
    pub total_sessions: usize,
}

pub fn history_stats(entries: &[HistoryEntry]) -> HistoryStats {
    HistoryStats {
        total_generated: entries.iter().map(|e| e.quantity).sum(),
        total_sessions: entries.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_entry(bin: &str, quantity: i64) -> NewHistoryEntry {
        NewHistoryEntry {
            bin: bin.to_string(),
            month: "04".to_string(),
            year: "2028".to_string(),
            security_code: String::new(),
            quantity,
            target_length: 16,
        }
    }

    fn memory_store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_create_and_list() {
        let conn = memory_store();
        let saved = conn.create("alice", &new_entry("456331", 10)).unwrap();
        conn.create("bob", &new_entry("515462", 5)).unwrap();

        let alice = conn.list("alice", 50).unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0], saved);
        assert_eq!(alice[0].id.len(), 36);
        assert!(!alice[0].is_favorite);
    }

    #[test]
    fn test_list_limit_newest_first() {
        let conn = memory_store();
        for i in 0..5 {
            conn.create("alice", &new_entry(&format!("45633{}", i), i)).unwrap();
        }
        let listed = conn.list("alice", 3).unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed[0].created_at >= listed[1].created_at);
        assert!(listed[1].created_at >= listed[2].created_at);
    }

    #[test]
    fn test_toggle_favorite_scoped_by_user() {
        let conn = memory_store();
        let saved = conn.create("alice", &new_entry("456331", 10)).unwrap();

        assert_eq!(conn.toggle_favorite("alice", &saved.id).unwrap(), Some(true));
        assert_eq!(conn.toggle_favorite("bob", &saved.id).unwrap(), None);
        assert_eq!(conn.toggle_favorite("alice", "missing").unwrap(), None);
        assert!(conn.list("alice", 50).unwrap()[0].is_favorite);
        assert_eq!(conn.toggle_favorite("alice", &saved.id).unwrap(), Some(false));
    }

    #[test]
    fn test_delete_and_clear() {
        let conn = memory_store();
        let a = conn.create("alice", &new_entry("456331", 10)).unwrap();
        conn.create("alice", &new_entry("456332", 10)).unwrap();
        conn.create("bob", &new_entry("515462", 5)).unwrap();

        assert!(!conn.delete("bob", &a.id).unwrap());
        assert!(conn.delete("alice", &a.id).unwrap());
        assert_eq!(conn.list("alice", 50).unwrap().len(), 1);

        assert_eq!(conn.clear("alice").unwrap(), 1);
        assert!(conn.list("alice", 50).unwrap().is_empty());
        assert_eq!(conn.list("bob", 50).unwrap().len(), 1);
    }

    #[test]
    fn test_target_length_round_trips() {
        let conn = memory_store();
        let mut entry = new_entry("456331", 2);
        entry.target_length = 19;
        conn.create("alice", &entry).unwrap();
        assert_eq!(conn.list("alice", 50).unwrap()[0].target_length, 19);
    }

    #[test]
    fn test_setup_adds_target_length_to_old_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE card_history (
                id TEXT PRIMARY KEY NOT NULL,
                user_id TEXT NOT NULL,
                bin TEXT NOT NULL,
                month TEXT NOT NULL,
                year TEXT NOT NULL,
                security_code TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO card_history VALUES ('old', 'alice', '456331', '', '', '', 4, 0, ?1)",
            params![Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)],
        )
        .unwrap();

        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        let listed = conn.list("alice", 50).unwrap();
        assert_eq!(listed[0].target_length, 16);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let conn = open_database(&path).unwrap();
            conn.create("alice", &new_entry("456331", 3)).unwrap();
        }
        let conn = open_database(&path).unwrap();
        assert_eq!(conn.list("alice", 50).unwrap().len(), 1);
    }

    #[test]
    fn test_sort_filter_stats() {
        let now = Utc::now();
        let make = |bin: &str, quantity: i64, age: i64, fav: bool| HistoryEntry {
            id: bin.to_string(),
            user_id: "alice".to_string(),
            bin: bin.to_string(),
            month: "01".to_string(),
            year: "2030".to_string(),
            security_code: String::new(),
            quantity,
            target_length: 16,
            is_favorite: fav,
            created_at: now - Duration::minutes(age),
        };
        let mut entries = vec![
            make("515462", 20, 3, false),
            make("456331", 5, 1, true),
            make("601100", 50, 2, false),
        ];

        sort_entries(&mut entries, HistorySort::BinAsc);
        assert_eq!(entries[0].bin, "456331");
        sort_entries(&mut entries, HistorySort::QuantityDesc);
        assert_eq!(entries[0].bin, "601100");
        sort_entries(&mut entries, HistorySort::DateAsc);
        assert_eq!(entries[0].bin, "515462");
        sort_entries(&mut entries, HistorySort::DateDesc);
        assert_eq!(entries[0].bin, "456331");

        assert_eq!(favorites(&entries).len(), 1);
        let stats = history_stats(&entries);
        assert_eq!(stats.total_generated, 75);
        assert_eq!(stats.total_sessions, 3);
    }

    #[test]
    fn test_sort_names_round_trip() {
        for sort in HistorySort::ALL {
            assert_eq!(sort.as_str().parse::<HistorySort>().unwrap(), sort);
        }
        assert_eq!(HistorySort::QuantityDesc.next(), HistorySort::DateDesc);
        assert!("newest".parse::<HistorySort>().is_err());
    }
}

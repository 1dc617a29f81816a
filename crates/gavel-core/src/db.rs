// SQLite persistence for client-local state: per-auction admin grants,
// the super-admin flag, and small key-value settings.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

const SUPER_ADMIN_KEY: &str = "super_admin";
const LAST_AUCTION_KEY: &str = "last_auction";

/// A stored admin grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminGrant {
    pub auction_id: String,
    pub granted_at: String,
}

pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral store.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open local store at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS admin_auth (
                auction_id TEXT PRIMARY KEY,
                granted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS client_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create local store schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A poisoned lock still guards a usable connection.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Admin grants
    // ------------------------------------------------------------------

    /// Remember that this client may run the console for `auction_id`.
    /// Re-granting keeps the original timestamp.
    pub fn grant_admin(&self, auction_id: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO admin_auth (auction_id) VALUES (?1)",
                params![auction_id],
            )
            .context("failed to store admin grant")?;
        Ok(())
    }

    pub fn is_admin(&self, auction_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM admin_auth WHERE auction_id = ?1",
                params![auction_id],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query admin grant")?;
        Ok(found.is_some())
    }

    pub fn revoke_admin(&self, auction_id: &str) -> Result<bool> {
        let removed = self
            .conn()
            .execute(
                "DELETE FROM admin_auth WHERE auction_id = ?1",
                params![auction_id],
            )
            .context("failed to revoke admin grant")?;
        Ok(removed > 0)
    }

    /// All grants, oldest first.
    pub fn admin_grants(&self) -> Result<Vec<AdminGrant>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT auction_id, granted_at FROM admin_auth ORDER BY granted_at, auction_id")
            .context("failed to prepare admin_grants query")?;
        let grants = stmt
            .query_map([], |row| {
                Ok(AdminGrant {
                    auction_id: row.get(0)?,
                    granted_at: row.get(1)?,
                })
            })
            .context("failed to query admin grants")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map admin grant rows")?;
        Ok(grants)
    }

    // ------------------------------------------------------------------
    // Super admin
    // ------------------------------------------------------------------

    pub fn set_super_admin(&self, enabled: bool) -> Result<()> {
        if enabled {
            self.save_state(SUPER_ADMIN_KEY, &serde_json::Value::Bool(true))
        } else {
            self.delete_state(SUPER_ADMIN_KEY)
        }
    }

    pub fn is_super_admin(&self) -> Result<bool> {
        Ok(matches!(
            self.load_state(SUPER_ADMIN_KEY)?,
            Some(serde_json::Value::Bool(true))
        ))
    }

    // ------------------------------------------------------------------
    // Last joined auction
    // ------------------------------------------------------------------

    pub fn set_last_auction(&self, auction_id: &str) -> Result<()> {
        self.save_state(LAST_AUCTION_KEY, &serde_json::Value::String(auction_id.to_string()))
    }

    pub fn last_auction(&self) -> Result<Option<String>> {
        Ok(self
            .load_state(LAST_AUCTION_KEY)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    // ------------------------------------------------------------------
    // Key-value state
    // ------------------------------------------------------------------

    /// Persist a JSON value under `key`, replacing any previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let json_str = serde_json::to_string(value).context("failed to serialize state value")?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO client_state (key, value) VALUES (?1, ?2)",
                params![key, json_str],
            )
            .context("failed to save state")?;
        Ok(())
    }

    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let json_str: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM client_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query client state")?;
        match json_str {
            Some(s) => {
                let value = serde_json::from_str(&s).context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn delete_state(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM client_state WHERE key = ?1", params![key])
            .context("failed to delete state")?;
        Ok(())
    }
}

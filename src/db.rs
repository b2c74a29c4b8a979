use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

const DB_PATH: &str = "data/drops.sqlite";

pub const ENDPOINT_URL: &str = "endpointUrl";
pub const INTERVAL_MINUTES: &str = "intervalMinutes";
pub const STATUS: &str = "status";
pub const LAST_RUN_AT: &str = "lastRunAt";
pub const LAST_ERROR: &str = "lastError";
pub const RUN_COUNT: &str = "runCount";
pub const LAST_CAMPAIGNS: &str = "lastCampaigns";
pub const SESSION_OWNER: &str = "sessionOwner";
pub const SESSION_HEARTBEAT: &str = "sessionHeartbeat";

const UPSERT: &str = "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

/// Process-wide key-value settings, backed by SQLite.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open the settings database at `DROPS_DB_PATH` (default `data/drops.sqlite`).
    pub fn open() -> Result<Self> {
        let path = std::env::var("DROPS_DB_PATH").unwrap_or_else(|_| DB_PATH.to_string());
        if let Some(dir) = std::path::Path::new(&path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // a panic while holding the lock cannot leave SQLite half-written
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> rusqlite::Result<Option<String>> {
        read(&self.conn(), key)
    }

    pub fn set(&self, key: &str, value: &str) -> rusqlite::Result<()> {
        self.conn().execute(UPSERT, rusqlite::params![key, value])?;
        Ok(())
    }

    /// Write several keys in one transaction. `None` deletes the key.
    pub fn set_many(&self, entries: &[(&str, Option<String>)]) -> rusqlite::Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare(UPSERT)?;
            let mut delete = tx.prepare("DELETE FROM settings WHERE key = ?1")?;
            for (key, value) in entries {
                match value {
                    Some(v) => upsert.execute(rusqlite::params![key, v])?,
                    None => delete.execute([key])?,
                };
            }
        }
        tx.commit()
    }

    /// Owner of the running session, if it is still heartbeating. Shared by
    /// every process that opens the same database.
    pub fn lease_holder(&self, now: DateTime<Utc>, ttl: Duration) -> rusqlite::Result<Option<String>> {
        live_holder(&self.conn(), now, ttl)
    }

    /// Take the session lease and mark the status `scraping` in one write
    /// transaction. Refused (`false`) while another holder is live; a holder
    /// whose heartbeat is older than `ttl` is treated as dead.
    pub fn claim_lease(&self, owner: &str, now: DateTime<Utc>, ttl: Duration) -> rusqlite::Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(holder) = live_holder(&tx, now, ttl)? {
            if holder != owner {
                return Ok(false);
            }
        }
        {
            let mut upsert = tx.prepare(UPSERT)?;
            upsert.execute(rusqlite::params![STATUS, "scraping"])?;
            upsert.execute(rusqlite::params![SESSION_OWNER, owner])?;
            upsert.execute(rusqlite::params![SESSION_HEARTBEAT, now.to_rfc3339()])?;
        }
        tx.execute("DELETE FROM settings WHERE key = ?1", [LAST_ERROR])?;
        tx.commit()?;
        Ok(true)
    }

    /// Refresh the heartbeat. `false` when `owner` no longer holds the lease.
    pub fn renew_lease(&self, owner: &str, now: DateTime<Utc>) -> rusqlite::Result<bool> {
        let updated = self.conn().execute(
            "UPDATE settings SET value = ?2, updated_at = datetime('now')
             WHERE key = ?3
               AND (SELECT value FROM settings WHERE key = ?4) = ?1",
            rusqlite::params![owner, now.to_rfc3339(), SESSION_HEARTBEAT, SESSION_OWNER],
        )?;
        Ok(updated > 0)
    }
}

fn read(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()
}

fn live_holder(conn: &Connection, now: DateTime<Utc>, ttl: Duration) -> rusqlite::Result<Option<String>> {
    if read(conn, STATUS)?.as_deref() != Some("scraping") {
        return Ok(None);
    }
    let Some(owner) = read(conn, SESSION_OWNER)? else {
        return Ok(None);
    };
    let fresh = read(conn, SESSION_HEARTBEAT)?
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .is_some_and(|beat| now - beat.with_timezone(&Utc) < ttl);
    Ok(fresh.then_some(owner))
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS settings (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

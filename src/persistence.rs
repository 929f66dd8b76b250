//! Result log: durable, append-only store of every scored transaction.

use crate::types::outcome::{Action, AuditRow};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Port for the audit trail. The pipeline appends exactly one row per
/// scored transaction; downstream consumers read the most recent rows.
#[async_trait]
pub trait ResultLog: Send + Sync {
    /// Durably append one audit row. Rows are ordered by arrival.
    async fn append(&self, row: &AuditRow) -> Result<()>;

    /// Fetch up to `limit` rows, most recent first.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditRow>>;
}

/// SQLite-backed result log.
///
/// A single connection behind a mutex serializes writes; insertion order
/// is the row order. WAL mode keeps readers from blocking the writer.
#[derive(Clone)]
pub struct SqliteResultLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteResultLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create result log dir {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open result log at {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("failed to configure result log pragmas")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                score REAL NOT NULL,
                action TEXT NOT NULL,
                raw TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create results table")?;

        info!(path = %path.display(), "Result log ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("result log lock poisoned: {e}"))
    }
}

#[async_trait]
impl ResultLog for SqliteResultLog {
    async fn append(&self, row: &AuditRow) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO results (transaction_id, timestamp, score, action, raw)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                row.transaction_id,
                row.timestamp,
                row.score,
                row.action.to_string(),
                row.raw
            ],
        )
        .context("failed to insert audit row")?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRow>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT transaction_id, timestamp, score, action, raw
                 FROM results ORDER BY id DESC LIMIT ?1",
            )
            .context("failed to prepare recent query")?;

        let rows = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                let action: String = row.get(3)?;
                Ok(AuditRow {
                    transaction_id: row.get(0)?,
                    timestamp: row.get(1)?,
                    score: row.get(2)?,
                    action: action.parse().unwrap_or(Action::Allow),
                    raw: row.get(4)?,
                })
            })
            .context("failed to query recent rows")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("failed to read audit row")?);
        }
        Ok(out)
    }
}

/// In-memory result log for tests and dry runs.
#[derive(Default)]
pub struct MemoryResultLog {
    rows: Mutex<Vec<AuditRow>>,
}

impl MemoryResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultLog for MemoryResultLog {
    async fn append(&self, row: &AuditRow) -> Result<()> {
        self.rows
            .lock()
            .map_err(|e| anyhow::anyhow!("memory log lock poisoned: {e}"))?
            .push(row.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRow>> {
        let rows = self
            .rows
            .lock()
            .map_err(|e| anyhow::anyhow!("memory log lock poisoned: {e}"))?;
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }
}

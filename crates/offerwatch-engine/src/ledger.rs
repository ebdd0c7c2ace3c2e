//! Append-only dispatch ledger over SQLite, plus per-run CSV export.
//!
//! The ledger is the sole durable owner of notification history: rows are
//! only ever inserted, and the set of identities with at least one `sent`
//! row is the "already notified" set every cycle diffs against.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use offerwatch_core::{DispatchOutcome, Identity, LedgerEntry, OfferwatchError, Result};
use rusqlite::Connection;

/// SQLite-backed ledger.
pub struct Ledger {
    conn: Mutex<Connection>,
}

impl Ledger {
    /// Open or create the ledger database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| OfferwatchError::Ledger(format!("open {}: {e}", path.display())))?;
        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.migrate()?;
        Ok(ledger)
    }

    /// In-memory ledger, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| OfferwatchError::Ledger(format!("open in-memory: {e}")))?;
        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.migrate()?;
        Ok(ledger)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute_batch(
                "
            -- Dispatch attempts. Append-only: rows are never updated or
            -- deleted, so the audit trail survives every code path.
            CREATE TABLE IF NOT EXISTS ledger (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                role TEXT NOT NULL,
                sent_at TEXT NOT NULL,
                status TEXT NOT NULL,            -- 'sent' or 'failed'
                reason TEXT,                     -- failure reason, NULL when sent
                remarks TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_ledger_status ON ledger(status);
            CREATE INDEX IF NOT EXISTS idx_ledger_run ON ledger(run_id);
         ",
            )
            .map_err(|e| OfferwatchError::Ledger(format!("migration: {e}")))?;
        Ok(())
    }

    /// Append one attempt. Any failure here is fatal to the cycle: losing
    /// the record of an attempted send risks a duplicate next cycle.
    pub fn append(&self, entry: &LedgerEntry) -> Result<()> {
        let (status, reason) = match &entry.outcome {
            DispatchOutcome::Sent => ("sent", None),
            DispatchOutcome::Failed(reason) => ("failed", Some(reason.as_str())),
        };
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO ledger (run_id, name, email, role, sent_at, status, reason, remarks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    entry.run_id,
                    entry.name,
                    entry.email,
                    entry.role,
                    entry.sent_at.to_rfc3339(),
                    status,
                    reason,
                    entry.remarks,
                ],
            )
            .map_err(|e| OfferwatchError::Ledger(format!("append: {e}")))?;
        Ok(())
    }

    /// Identities with at least one `sent` row — the durable notified set.
    pub fn notified_identities(&self) -> Result<HashSet<Identity>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name, email FROM ledger WHERE status = 'sent'")
            .map_err(|e| OfferwatchError::Ledger(format!("notified query: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Identity::of(
                    &row.get::<_, String>(0)?,
                    &row.get::<_, String>(1)?,
                ))
            })
            .map_err(|e| OfferwatchError::Ledger(format!("notified query: {e}")))?;
        let mut notified = HashSet::new();
        for identity in rows {
            notified
                .insert(identity.map_err(|e| OfferwatchError::Ledger(format!("notified row: {e}")))?);
        }
        Ok(notified)
    }

    /// Most recent entries, newest first. Operator surface.
    pub fn recent(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        self.query_entries(
            "SELECT run_id, name, email, role, sent_at, status, reason, remarks
             FROM ledger ORDER BY id DESC LIMIT ?1",
            rusqlite::params![limit as i64],
        )
    }

    /// Entries of one cycle run, in dispatch order.
    pub fn entries_for_run(&self, run_id: &str) -> Result<Vec<LedgerEntry>> {
        self.query_entries(
            "SELECT run_id, name, email, role, sent_at, status, reason, remarks
             FROM ledger WHERE run_id = ?1 ORDER BY id",
            rusqlite::params![run_id],
        )
    }

    fn query_entries(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| OfferwatchError::Ledger(format!("query: {e}")))?;
        let rows = stmt
            .query_map(params, |row| {
                let sent_at_str: String = row.get(4)?;
                let status: String = row.get(5)?;
                let reason: Option<String> = row.get(6)?;
                let outcome = if status == "sent" {
                    DispatchOutcome::Sent
                } else {
                    DispatchOutcome::Failed(reason.unwrap_or_else(|| "unknown".into()))
                };
                Ok(LedgerEntry {
                    run_id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    role: row.get(3)?,
                    sent_at: DateTime::parse_from_rfc3339(&sent_at_str)
                        .map(|d| d.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    outcome,
                    remarks: row.get(7)?,
                })
            })
            .map_err(|e| OfferwatchError::Ledger(format!("query: {e}")))?;
        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry.map_err(|e| OfferwatchError::Ledger(format!("row: {e}")))?);
        }
        Ok(entries)
    }

    /// Export one run as a timestamped CSV for the operator.
    ///
    /// Best-effort: the SQLite ledger is the durable record, so callers
    /// treat a failure here as a warning, not a cycle abort.
    pub fn export_run(&self, run_id: &str, dir: &Path) -> Result<PathBuf> {
        let entries = self.entries_for_run(run_id)?;
        std::fs::create_dir_all(dir)?;
        let filename = format!("email_ledger_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(filename);

        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| OfferwatchError::Ledger(format!("export {}: {e}", path.display())))?;
        writer
            .write_record([
                "Candidate Name",
                "Email",
                "Role",
                "Send Date",
                "Send Time",
                "Status",
                "Remarks",
            ])
            .map_err(|e| OfferwatchError::Ledger(format!("export: {e}")))?;
        for entry in &entries {
            let date = entry.sent_at.format("%Y-%m-%d").to_string();
            let time = entry.sent_at.format("%H:%M:%S").to_string();
            let status = entry.outcome.status_text();
            writer
                .write_record([
                    entry.name.as_str(),
                    entry.email.as_str(),
                    entry.role.as_str(),
                    date.as_str(),
                    time.as_str(),
                    status.as_str(),
                    entry.remarks.as_str(),
                ])
                .map_err(|e| OfferwatchError::Ledger(format!("export: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| OfferwatchError::Ledger(format!("export: {e}")))?;

        tracing::info!("💾 Exported {} ledger row(s) to {}", entries.len(), path.display());
        Ok(path)
    }
}

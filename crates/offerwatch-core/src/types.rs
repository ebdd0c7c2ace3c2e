//! Core data model: candidate records, identities, dispatch outcomes,
//! and ledger rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One validated row of the candidate data source.
///
/// Constructed only by the snapshot loader, which guarantees name and
/// email are present. Everything else is optional free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    pub email: String,
    /// Role / employment type — the template lookup key.
    pub role: String,
    pub location: Option<String>,
    /// Free-text status column, matched against the configured target.
    pub status: String,
    /// Joining date, kept as the source wrote it.
    pub start_date: Option<String>,
    pub department: Option<String>,
    /// 1-based data row in the source file. Drives dispatch order.
    pub row: usize,
}

impl CandidateRecord {
    pub fn identity(&self) -> Identity {
        Identity::of(&self.name, &self.email)
    }
}

/// Deterministic candidate key derived from name + email.
///
/// Two rows with the same normalized name and email are the same candidate
/// for notification purposes, even if other fields differ. Distinct people
/// who legitimately share both values collapse into one key — a documented
/// limitation, not special-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    /// Derive the key: both parts trimmed and lowercased.
    pub fn of(name: &str, email: &str) -> Self {
        Self(format!(
            "{}|{}",
            name.trim().to_lowercase(),
            email.trim().to_lowercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    Sent,
    /// Human-readable failure reason, surfaced verbatim in the ledger.
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent)
    }

    /// Ledger column form: `Sent` or `Failed: <reason>`.
    pub fn status_text(&self) -> String {
        match self {
            DispatchOutcome::Sent => "Sent".to_string(),
            DispatchOutcome::Failed(reason) => format!("Failed: {reason}"),
        }
    }
}

/// One immutable row of the dispatch ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Cycle run this attempt belongs to.
    pub run_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    /// When the attempt was recorded (UTC).
    pub sent_at: DateTime<Utc>,
    pub outcome: DispatchOutcome,
    pub remarks: String,
}

impl LedgerEntry {
    pub fn identity(&self) -> Identity {
        Identity::of(&self.name, &self.email)
    }
}

/// Per-cycle counts reported to the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub run_id: String,
    /// Rows selected by the transition detector this cycle.
    pub eligible: usize,
    pub sent: usize,
    pub failed: usize,
    /// Source rows rejected by the loader (missing name/email).
    pub skipped_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_normalizes_case_and_whitespace() {
        let a = Identity::of("Ada Lovelace", "ADA@example.com ");
        let b = Identity::of("  ada lovelace", "ada@example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn identity_distinguishes_different_emails() {
        let a = Identity::of("Ada", "ada@example.com");
        let b = Identity::of("Ada", "ada@example.org");
        assert_ne!(a, b);
    }

    #[test]
    fn outcome_status_text() {
        assert_eq!(DispatchOutcome::Sent.status_text(), "Sent");
        assert_eq!(
            DispatchOutcome::Failed("timed out".into()).status_text(),
            "Failed: timed out"
        );
    }
}

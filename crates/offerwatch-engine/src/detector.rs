//! Transition detector — a pure diff of a snapshot against the notified set.
//!
//! Detection is snapshot-vs-ledger, never snapshot-vs-previous-snapshot:
//! the previous in-memory snapshot does not survive a restart, so the
//! ledger-derived notified set is the only safe source of "already
//! handled".

use std::collections::{HashMap, HashSet};

use offerwatch_core::{CandidateRecord, Identity};

use crate::snapshot::Snapshot;

/// The single place the target-status comparison rule lives.
///
/// The upstream sheets disagree on casing ("Offered" vs "offered"), so the
/// match is case-insensitive after trimming.
#[derive(Debug, Clone)]
pub struct StatusMatcher {
    target: String,
}

impl StatusMatcher {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.trim().to_lowercase(),
        }
    }

    pub fn matches(&self, status: &str) -> bool {
        status.trim().to_lowercase() == self.target
    }
}

/// Select the records newly eligible for notification.
///
/// Pure function over its inputs. Duplicate identities within the snapshot
/// collapse to the last occurrence (with a warning per shadowed row).
/// The result carries every record whose status matches the target and
/// whose identity is not in `notified`, ordered by original row index so
/// dispatch order is deterministic.
pub fn detect(
    snapshot: &Snapshot,
    notified: &HashSet<Identity>,
    matcher: &StatusMatcher,
) -> Vec<CandidateRecord> {
    let mut winners: HashMap<Identity, &CandidateRecord> = HashMap::new();
    for record in &snapshot.records {
        if let Some(shadowed) = winners.insert(record.identity(), record) {
            tracing::warn!(
                "⚠️ Duplicate rows for {} <{}>: row {} shadows row {}",
                record.name,
                record.email,
                record.row,
                shadowed.row
            );
        }
    }

    let mut eligible: Vec<CandidateRecord> = winners
        .into_values()
        .filter(|r| matcher.matches(&r.status))
        .filter(|r| !notified.contains(&r.identity()))
        .cloned()
        .collect();
    eligible.sort_by_key(|r| r.row);
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: usize, name: &str, email: &str, status: &str) -> CandidateRecord {
        CandidateRecord {
            name: name.into(),
            email: email.into(),
            role: "Intern".into(),
            location: None,
            status: status.into(),
            start_date: None,
            department: None,
            row,
        }
    }

    fn snapshot(records: Vec<CandidateRecord>) -> Snapshot {
        Snapshot {
            records,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn selects_only_target_status() {
        let snap = snapshot(vec![
            record(1, "Ada", "ada@x.com", "Offered"),
            record(2, "Bo", "bo@x.com", "Interviewing"),
        ]);
        let out = detect(&snap, &HashSet::new(), &StatusMatcher::new("Offered"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Ada");
    }

    #[test]
    fn status_match_ignores_case_and_whitespace() {
        let snap = snapshot(vec![
            record(1, "Ada", "ada@x.com", "offered"),
            record(2, "Bo", "bo@x.com", " OFFERED "),
        ]);
        let out = detect(&snap, &HashSet::new(), &StatusMatcher::new("Offered"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn never_reselects_notified_identities() {
        let snap = snapshot(vec![
            record(1, "Ada", "ada@x.com", "Offered"),
            record(2, "Bo", "bo@x.com", "Offered"),
        ]);
        let mut notified = HashSet::new();
        notified.insert(Identity::of("Ada", "ada@x.com"));
        let out = detect(&snap, &notified, &StatusMatcher::new("Offered"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Bo");
        assert!(out.iter().all(|r| !notified.contains(&r.identity())));
    }

    #[test]
    fn detect_is_idempotent() {
        let snap = snapshot(vec![record(1, "Ada", "ada@x.com", "Offered")]);
        let notified = HashSet::new();
        let matcher = StatusMatcher::new("Offered");
        assert_eq!(
            detect(&snap, &notified, &matcher),
            detect(&snap, &notified, &matcher)
        );
    }

    #[test]
    fn duplicate_identity_counted_once_last_occurrence_wins() {
        let mut late = record(3, "Ada", "ada@x.com", "Offered");
        late.role = "Apprentice".into();
        let snap = snapshot(vec![
            record(1, "Ada", "ada@x.com", "Offered"),
            record(2, "Bo", "bo@x.com", "Offered"),
            late,
        ]);
        let out = detect(&snap, &HashSet::new(), &StatusMatcher::new("Offered"));
        assert_eq!(out.len(), 2);
        // Row order is preserved; Ada carries the last occurrence's fields.
        assert_eq!(out[0].name, "Bo");
        assert_eq!(out[1].name, "Ada");
        assert_eq!(out[1].role, "Apprentice");
        assert_eq!(out[1].row, 3);
    }

    #[test]
    fn result_is_ordered_by_source_row() {
        let snap = snapshot(vec![
            record(5, "E", "e@x.com", "Offered"),
            record(2, "B", "b@x.com", "Offered"),
            record(9, "I", "i@x.com", "Offered"),
        ]);
        let out = detect(&snap, &HashSet::new(), &StatusMatcher::new("Offered"));
        let rows: Vec<usize> = out.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![2, 5, 9]);
    }
}

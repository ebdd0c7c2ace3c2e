//! Snapshot loader — one full, validated read of the candidate file.
//!
//! The header is resolved once up front and the load fails fast if a
//! required column is absent; rows are never probed lazily per field.
//! Unrecognized extra columns are ignored.

use std::path::Path;

use offerwatch_core::{CandidateRecord, OfferwatchError, Result};

// Column spellings seen across the upstream sheet variants, lowercase.
const NAME_ALIASES: &[&str] = &["name", "candidate name"];
const EMAIL_ALIASES: &[&str] = &["email", "candidate email id", "candidate email"];
const ROLE_ALIASES: &[&str] = &["role", "emp type", "employment type"];
const LOCATION_ALIASES: &[&str] = &["location"];
const STATUS_ALIASES: &[&str] = &["status"];
const START_DATE_ALIASES: &[&str] = &["start_date", "start date", "doj", "joining date"];
const DEPARTMENT_ALIASES: &[&str] = &["department"];

/// A full read of the candidate file at one point in time.
///
/// Replaced wholesale on every detected change; never merged field-by-field
/// with the previous snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<CandidateRecord>,
    /// Rows the loader rejected: (1-based data row, reason). Reported to
    /// the operator, never silently dropped.
    pub skipped: Vec<(usize, String)>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Column indexes resolved from the header.
struct Columns {
    name: usize,
    email: usize,
    role: usize,
    status: usize,
    location: Option<usize>,
    start_date: Option<usize>,
    department: Option<usize>,
}

impl Columns {
    fn resolve(header: &csv::StringRecord) -> Result<Self> {
        let lower: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |aliases: &[&str]| lower.iter().position(|h| aliases.contains(&h.as_str()));

        let mut missing = Vec::new();
        let name = find(NAME_ALIASES);
        let email = find(EMAIL_ALIASES);
        let role = find(ROLE_ALIASES);
        let status = find(STATUS_ALIASES);
        if name.is_none() {
            missing.push("name");
        }
        if email.is_none() {
            missing.push("email");
        }
        if role.is_none() {
            missing.push("role");
        }
        if status.is_none() {
            missing.push("status");
        }
        if !missing.is_empty() {
            return Err(OfferwatchError::Schema(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            name: name.unwrap(),
            email: email.unwrap(),
            role: role.unwrap(),
            status: status.unwrap(),
            location: find(LOCATION_ALIASES),
            start_date: find(START_DATE_ALIASES),
            department: find(DEPARTMENT_ALIASES),
        })
    }
}

fn required(record: &csv::StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn optional(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| required(record, i))
}

/// Read the whole candidate file into a [`Snapshot`].
///
/// A file-level failure (missing, locked, malformed CSV) returns
/// `SourceRead` and the cycle must not mutate any state. Individual rows
/// missing name or email are skipped with a per-row reason.
pub fn load(path: &Path) -> Result<Snapshot> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| OfferwatchError::SourceRead(format!("{}: {e}", path.display())))?;

    let header = reader
        .headers()
        .map_err(|e| OfferwatchError::SourceRead(format!("{}: {e}", path.display())))?
        .clone();
    let columns = Columns::resolve(&header)?;

    let mut snapshot = Snapshot::default();
    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let record = result
            .map_err(|e| OfferwatchError::SourceRead(format!("{} row {row}: {e}", path.display())))?;

        let (name, email) = match (
            required(&record, columns.name),
            required(&record, columns.email),
        ) {
            (Some(name), Some(email)) => (name, email),
            (name, email) => {
                let mut absent = Vec::new();
                if name.is_none() {
                    absent.push("name");
                }
                if email.is_none() {
                    absent.push("email");
                }
                let reason = format!("missing {}", absent.join(" and "));
                tracing::warn!("⚠️ Skipping row {row}: {reason}");
                snapshot.skipped.push((row, reason));
                continue;
            }
        };

        snapshot.records.push(CandidateRecord {
            name,
            email,
            role: required(&record, columns.role).unwrap_or_default(),
            location: optional(&record, columns.location),
            status: required(&record, columns.status).unwrap_or_default(),
            start_date: optional(&record, columns.start_date),
            department: optional(&record, columns.department),
            row,
        });
    }

    tracing::debug!(
        "📄 Loaded snapshot: {} record(s), {} skipped",
        snapshot.records.len(),
        snapshot.skipped.len()
    );
    Ok(snapshot)
}

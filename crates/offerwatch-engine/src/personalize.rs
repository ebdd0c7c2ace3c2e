//! Placeholder substitution over the fixed recognized set.
//!
//! Literal string replacement, never typed interpolation. Absent fields
//! resolve to their documented defaults, so rendering cannot fail.
//! Anything outside the recognized set is left verbatim.

use offerwatch_core::CandidateRecord;

/// Rendered for `{department}` when the record has none.
pub const MISSING_DEPARTMENT: &str = "N/A";
/// Rendered for `{start_date}` when the record has none.
pub const MISSING_START_DATE: &str = "TBD";

/// Substitute the recognized placeholders with the record's field values.
///
/// `company_location` is the configured fallback for `{location}`.
pub fn render(template: &str, record: &CandidateRecord, company_location: &str) -> String {
    template
        .replace("{name}", &record.name)
        .replace("{email}", &record.email)
        .replace("{role}", &record.role)
        .replace(
            "{department}",
            record.department.as_deref().unwrap_or(MISSING_DEPARTMENT),
        )
        .replace(
            "{start_date}",
            record.start_date.as_deref().unwrap_or(MISSING_START_DATE),
        )
        .replace(
            "{location}",
            record.location.as_deref().unwrap_or(company_location),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CandidateRecord {
        CandidateRecord {
            name: "Ada".into(),
            email: "ada@x.com".into(),
            role: "Intern".into(),
            location: Some("Pune".into()),
            status: "Offered".into(),
            start_date: Some("2026-09-01".into()),
            department: None,
            row: 1,
        }
    }

    #[test]
    fn substitutes_present_fields() {
        let out = render(
            "Hi {name} ({email}), your {role} role starts {start_date} in {location}.",
            &record(),
            "HQ",
        );
        assert_eq!(
            out,
            "Hi Ada (ada@x.com), your Intern role starts 2026-09-01 in Pune."
        );
        // No recognized token survives for fields the record has.
        for token in ["{name}", "{email}", "{role}", "{start_date}", "{location}"] {
            assert!(!out.contains(token));
        }
    }

    #[test]
    fn absent_fields_use_documented_defaults() {
        let mut r = record();
        r.department = None;
        r.start_date = None;
        r.location = None;
        let out = render("{department} / {start_date} / {location}", &r, "HQ");
        assert_eq!(out, "N/A / TBD / HQ");
    }

    #[test]
    fn unknown_placeholders_are_left_verbatim() {
        let out = render("Hi {name}, ref {ticket_id}", &record(), "HQ");
        assert_eq!(out, "Hi Ada, ref {ticket_id}");
    }
}

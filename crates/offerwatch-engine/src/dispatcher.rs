//! Dispatcher — builds and sends one message per eligible record, and
//! records every attempt.
//!
//! One candidate's failure never aborts the batch: per-candidate errors
//! become `Failed` ledger outcomes and the loop continues. Only a ledger
//! append failure stops the cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use offerwatch_core::{
    CandidateRecord, DispatchOutcome, Identity, LedgerEntry, OfferwatchError, Result, Transport,
};

use crate::ledger::Ledger;
use crate::personalize;
use crate::templates::TemplateStore;

const SENT_REMARK: &str = "Offer email sent successfully";

/// Per-cycle dispatcher over a template store and a transport capability.
pub struct Dispatcher {
    templates: TemplateStore,
    transport: Arc<dyn Transport>,
    company_location: String,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        templates: TemplateStore,
        transport: Arc<dyn Transport>,
        company_location: &str,
        send_timeout: Duration,
    ) -> Self {
        Self {
            templates,
            transport,
            company_location: company_location.to_string(),
            send_timeout,
        }
    }

    /// Subject line for a record's role.
    pub fn subject(role: &str) -> String {
        format!("Offer Letter - {} Position", capitalize(role))
    }

    /// Attempt one record. Per-candidate errors are classified here and
    /// never escape.
    pub async fn dispatch(&self, record: &CandidateRecord) -> DispatchOutcome {
        match self.try_send(record).await {
            Ok(()) => {
                tracing::info!(
                    "✅ Offer email sent to {} <{}> ({})",
                    record.name,
                    record.email,
                    record.role
                );
                DispatchOutcome::Sent
            }
            Err(e) => {
                tracing::warn!("⚠️ Dispatch failed for {} <{}>: {e}", record.name, record.email);
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_send(&self, record: &CandidateRecord) -> Result<()> {
        let template = self.templates.resolve(&record.role)?;
        let body = personalize::render(template, record, &self.company_location);
        let subject = Self::subject(&record.role);
        match tokio::time::timeout(
            self.send_timeout,
            self.transport.send(&record.email, &subject, &body),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(OfferwatchError::Transport(format!(
                "send timed out after {}s",
                self.send_timeout.as_secs()
            ))),
        }
    }

    /// Process a batch sequentially: exactly one ledger append per
    /// attempted record, and a sent identity joins `notified` immediately
    /// so a duplicate later in the same batch is skipped.
    ///
    /// Returns (sent, failed) counts; errors only on ledger writes.
    pub async fn run_batch(
        &self,
        run_id: &str,
        records: &[CandidateRecord],
        ledger: &Ledger,
        notified: &mut HashSet<Identity>,
    ) -> Result<(usize, usize)> {
        let mut sent = 0;
        let mut failed = 0;
        for record in records {
            let identity = record.identity();
            if notified.contains(&identity) {
                tracing::debug!("Skipping {}: already notified this batch", record.email);
                continue;
            }

            let outcome = self.dispatch(record).await;
            let remarks = match &outcome {
                DispatchOutcome::Sent => format!("{SENT_REMARK} via {}", self.transport.name()),
                DispatchOutcome::Failed(_) => String::new(),
            };
            ledger.append(&LedgerEntry {
                run_id: run_id.to_string(),
                name: record.name.clone(),
                email: record.email.clone(),
                role: record.role.clone(),
                sent_at: Utc::now(),
                outcome: outcome.clone(),
                remarks,
            })?;

            if outcome.is_sent() {
                notified.insert(identity);
                sent += 1;
            } else {
                failed += 1;
            }
        }
        Ok((sent, failed))
    }
}

/// First character uppercased, the rest lowercased ("INTERN" -> "Intern").
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records sends and fails on chosen attempt numbers (1-based).
    struct MockTransport {
        fail_on: Vec<usize>,
        sends: Mutex<Vec<(String, String, String)>>,
        attempts: Mutex<usize>,
    }

    impl MockTransport {
        fn new(fail_on: Vec<usize>) -> Arc<Self> {
            Arc::new(Self {
                fail_on,
                sends: Mutex::new(Vec::new()),
                attempts: Mutex::new(0),
            })
        }

        fn sent_to(&self) -> Vec<String> {
            self.sends.lock().unwrap().iter().map(|s| s.0.clone()).collect()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        fn name(&self) -> &str {
            "mock"
        }

        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                *attempts += 1;
                *attempts
            };
            if self.fail_on.contains(&attempt) {
                return Err(OfferwatchError::Transport("connection refused".into()));
            }
            self.sends
                .lock()
                .unwrap()
                .push((to.into(), subject.into(), body.into()));
            Ok(())
        }
    }

    fn record(row: usize, name: &str, email: &str, role: &str) -> CandidateRecord {
        CandidateRecord {
            name: name.into(),
            email: email.into(),
            role: role.into(),
            location: None,
            status: "Offered".into(),
            start_date: None,
            department: None,
            row,
        }
    }

    fn dispatcher(transport: Arc<MockTransport>) -> Dispatcher {
        let templates =
            TemplateStore::from_pairs([("Intern", "Hi {name}"), ("default", "Congratulations!")]);
        Dispatcher::new(templates, transport, "HQ", Duration::from_secs(5))
    }

    #[test]
    fn subject_capitalizes_role() {
        assert_eq!(Dispatcher::subject("intern"), "Offer Letter - Intern Position");
        assert_eq!(
            Dispatcher::subject("INTERN"),
            "Offer Letter - Intern Position"
        );
    }

    #[tokio::test]
    async fn renders_role_template_into_body() {
        let transport = MockTransport::new(vec![]);
        let d = dispatcher(transport.clone());
        let outcome = d.dispatch(&record(1, "Ada", "ada@x.com", "Intern")).await;
        assert!(outcome.is_sent());
        let sends = transport.sends.lock().unwrap();
        assert_eq!(sends[0].1, "Offer Letter - Intern Position");
        assert_eq!(sends[0].2, "Hi Ada");
    }

    #[tokio::test]
    async fn missing_template_fails_that_candidate_only() {
        let transport = MockTransport::new(vec![]);
        let templates = TemplateStore::from_pairs([("Intern", "Hi {name}")]);
        let d = Dispatcher::new(templates, transport.clone(), "HQ", Duration::from_secs(5));
        let outcome = d.dispatch(&record(1, "Bo", "bo@x.com", "Apprentice")).await;
        assert!(matches!(outcome, DispatchOutcome::Failed(_)));
        assert!(transport.sent_to().is_empty());
    }

    #[tokio::test]
    async fn one_failure_never_aborts_the_batch() {
        let transport = MockTransport::new(vec![3]);
        let d = dispatcher(transport.clone());
        let records: Vec<CandidateRecord> = (1..=5)
            .map(|i| record(i, &format!("C{i}"), &format!("c{i}@x.com"), "Intern"))
            .collect();

        let ledger = Ledger::open_in_memory().unwrap();
        let mut notified = HashSet::new();
        let (sent, failed) = d
            .run_batch("r1", &records, &ledger, &mut notified)
            .await
            .unwrap();

        assert_eq!((sent, failed), (4, 1));
        // Exactly one ledger entry per attempted record.
        let entries = ledger.entries_for_run("r1").unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries.iter().filter(|e| e.outcome.is_sent()).count(), 4);
        // The 4th and 5th were still attempted after the 3rd failed.
        assert_eq!(transport.sent_to(), vec!["c1@x.com", "c2@x.com", "c4@x.com", "c5@x.com"]);
        assert!(!notified.contains(&Identity::of("C3", "c3@x.com")));
    }

    #[tokio::test]
    async fn same_identity_later_in_batch_is_skipped() {
        let transport = MockTransport::new(vec![]);
        let d = dispatcher(transport.clone());
        let records = vec![
            record(1, "Ada", "ada@x.com", "Intern"),
            record(2, "Ada", "ADA@x.com", "Intern"),
        ];
        let ledger = Ledger::open_in_memory().unwrap();
        let mut notified = HashSet::new();
        let (sent, _) = d
            .run_batch("r1", &records, &ledger, &mut notified)
            .await
            .unwrap();
        assert_eq!(sent, 1);
        assert_eq!(ledger.entries_for_run("r1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn slow_transport_is_classified_as_failed() {
        struct SlowTransport;
        #[async_trait]
        impl Transport for SlowTransport {
            fn name(&self) -> &str {
                "slow"
            }
            async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<()> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        }

        let templates = TemplateStore::from_pairs([("default", "Hi")]);
        let d = Dispatcher::new(
            templates,
            Arc::new(SlowTransport),
            "HQ",
            Duration::from_millis(20),
        );
        let outcome = d.dispatch(&record(1, "Ada", "ada@x.com", "Intern")).await;
        match outcome {
            DispatchOutcome::Failed(reason) => assert!(reason.contains("timed out")),
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }
}

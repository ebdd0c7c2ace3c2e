//! Engine context — explicit application state, created at startup and
//! passed to every component. Nothing here is ambient or global.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use offerwatch_core::{
    CandidateRecord, CycleSummary, Identity, LedgerEntry, OfferwatchConfig, Result, Transport,
};

use crate::detector::{self, StatusMatcher};
use crate::dispatcher::Dispatcher;
use crate::ledger::Ledger;
use crate::snapshot::{self, Snapshot};
use crate::templates::TemplateStore;

/// Phase of the cycle runner. Always back to `Idle` when a cycle ends,
/// successfully or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Loading,
    Detecting,
    Dispatching,
}

/// The engine owns the current snapshot, the in-memory notified set, and
/// the cycle lifecycle. One engine per monitored data source.
pub struct Engine {
    config: OfferwatchConfig,
    ledger: Ledger,
    transport: Arc<dyn Transport>,
    matcher: StatusMatcher,
    /// Seeded from the ledger at startup, grows as sends succeed.
    notified: HashSet<Identity>,
    /// Replaced wholesale on every successful load, never merged.
    snapshot: Snapshot,
    state: CycleState,
}

impl Engine {
    /// Build the context. Reads the durable notified set from the ledger
    /// so restarts never re-notify.
    pub fn new(
        config: OfferwatchConfig,
        ledger: Ledger,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let notified = ledger.notified_identities()?;
        let matcher = StatusMatcher::new(&config.source.target_status);
        tracing::info!(
            "🗂 Ledger holds {} previously notified candidate(s)",
            notified.len()
        );
        Ok(Self {
            config,
            ledger,
            transport,
            matcher,
            notified,
            snapshot: Snapshot::default(),
            state: CycleState::Idle,
        })
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Re-read the candidate file and replace the current snapshot.
    /// On failure nothing is mutated.
    pub fn load_snapshot(&mut self) -> Result<&Snapshot> {
        self.snapshot = snapshot::load(Path::new(&self.config.source.path))?;
        Ok(&self.snapshot)
    }

    /// Who would be notified if a cycle ran over the current snapshot.
    /// No sends, no state changes.
    pub fn eligible(&self) -> Vec<CandidateRecord> {
        detector::detect(&self.snapshot, &self.notified, &self.matcher)
    }

    /// Recent ledger entries for the operator surface.
    pub fn recent_ledger(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        self.ledger.recent(limit)
    }

    /// One full load → detect → dispatch cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleSummary> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let result = self.cycle_inner(&run_id).await;
        self.state = CycleState::Idle;
        result
    }

    async fn cycle_inner(&mut self, run_id: &str) -> Result<CycleSummary> {
        self.state = CycleState::Loading;
        self.load_snapshot()?;
        // Templates are re-read each cycle so edits apply without restart.
        let templates = TemplateStore::load(Path::new(&self.config.templates.path))?;

        self.state = CycleState::Detecting;
        let eligible = detector::detect(&self.snapshot, &self.notified, &self.matcher);

        self.state = CycleState::Dispatching;
        let dispatcher = Dispatcher::new(
            templates,
            self.transport.clone(),
            &self.config.templates.company_location,
            Duration::from_secs(self.config.transport.send_timeout_secs),
        );
        let (sent, failed) = dispatcher
            .run_batch(run_id, &eligible, &self.ledger, &mut self.notified)
            .await?;

        if sent + failed > 0
            && let Err(e) = self
                .ledger
                .export_run(run_id, Path::new(&self.config.ledger.export_dir))
        {
            tracing::warn!("⚠️ Ledger export failed: {e}");
        }

        let summary = CycleSummary {
            run_id: run_id.to_string(),
            eligible: eligible.len(),
            sent,
            failed,
            skipped_rows: self.snapshot.skipped.len(),
        };
        tracing::info!(
            "📬 Cycle complete: {} eligible, {} sent, {} failed, {} row(s) skipped",
            summary.eligible,
            summary.sent,
            summary.failed,
            summary.skipped_rows
        );
        Ok(summary)
    }
}

//! Source watcher — turns file changes into serialized dispatch cycles.
//!
//! Triggers flow through a one-slot channel into a single cycle runner:
//! one logical cycle at a time per source, and a burst of changes while a
//! cycle is in progress coalesces into exactly one follow-up cycle.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use offerwatch_core::config::{SourceConfig, TriggerMode};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

use crate::engine::Engine;

/// Producer side: requests cycles.
#[derive(Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<()>,
}

impl TriggerHandle {
    /// Request a cycle. Returns false when one is already pending — the
    /// extra trigger is coalesced away, not queued.
    pub fn trigger(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Consumer side: runs one cycle per received trigger, strictly serially.
pub struct CycleRunner {
    engine: Arc<Mutex<Engine>>,
    rx: mpsc::Receiver<()>,
}

/// Build the one-slot trigger channel around an engine.
pub fn trigger_channel(engine: Arc<Mutex<Engine>>) -> (TriggerHandle, CycleRunner) {
    let (tx, rx) = mpsc::channel(1);
    (TriggerHandle { tx }, CycleRunner { engine, rx })
}

impl CycleRunner {
    /// Drain triggers until every handle is dropped.
    pub async fn run(mut self) {
        while self.run_next().await {}
        tracing::info!("Watcher stopped: all trigger sources gone");
    }

    /// Wait for one trigger and run one cycle. The engine lock is held for
    /// the whole cycle, so detection and dispatch never overlap for one
    /// source. Returns false when all trigger handles are gone.
    pub async fn run_next(&mut self) -> bool {
        if self.rx.recv().await.is_none() {
            return false;
        }
        let mut engine = self.engine.lock().await;
        if let Err(e) = engine.run_cycle().await {
            // Reported, nothing mutated; the next trigger retries.
            tracing::error!("❌ Cycle failed: {e}");
        }
        true
    }
}

/// (mtime, len) fingerprint of the source file. None while it is absent.
fn fingerprint(path: &Path) -> Option<(SystemTime, u64)> {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

/// Spawn the trigger producer for the configured mode.
///
/// `Watch` polls the source file's metadata and triggers only when it
/// changed since the last look; `Interval` triggers every period. The
/// first tick fires immediately, so rows already in the target status at
/// startup are processed without waiting for an edit.
pub fn spawn_triggers(handle: TriggerHandle, source: SourceConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let path = PathBuf::from(&source.path);
        let mut interval = tokio::time::interval(Duration::from_secs(source.check_secs.max(1)));
        let mut last_seen: Option<(SystemTime, u64)> = None;
        tracing::info!(
            "👀 Watching {} ({:?} mode, every {}s)",
            path.display(),
            source.mode,
            source.check_secs.max(1)
        );
        loop {
            interval.tick().await;
            match source.mode {
                TriggerMode::Interval => {
                    handle.trigger();
                }
                TriggerMode::Watch => {
                    let current = fingerprint(&path);
                    if current != last_seen {
                        last_seen = current;
                        if current.is_some() {
                            handle.trigger();
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use offerwatch_core::{OfferwatchConfig, Result, Transport};
    use std::sync::Mutex as StdMutex;

    use crate::ledger::Ledger;

    struct CountingTransport {
        sent: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        fn name(&self) -> &str {
            "counting"
        }
        async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<()> {
            self.sent.lock().unwrap().push(to.into());
            Ok(())
        }
    }

    fn setup(name: &str, candidates: &str) -> (PathBuf, Arc<Mutex<Engine>>, Arc<CountingTransport>) {
        let dir = std::env::temp_dir().join(format!("offerwatch-watcher-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("candidates.csv"), candidates).unwrap();
        std::fs::write(dir.join("templates.csv"), "role,template\ndefault,Hi {name}\n").unwrap();

        let mut config = OfferwatchConfig::default();
        config.source.path = dir.join("candidates.csv").display().to_string();
        config.templates.path = dir.join("templates.csv").display().to_string();
        config.ledger.export_dir = dir.join("exports").display().to_string();

        let transport = Arc::new(CountingTransport {
            sent: StdMutex::new(Vec::new()),
        });
        let engine =
            Engine::new(config, Ledger::open_in_memory().unwrap(), transport.clone()).unwrap();
        (dir, Arc::new(Mutex::new(engine)), transport)
    }

    #[tokio::test]
    async fn burst_of_triggers_coalesces_to_one_pending() {
        let (dir, engine, _transport) = setup(
            "coalesce",
            "name,email,role,status\nA,a@x.com,Intern,Offered\n",
        );
        let (handle, mut runner) = trigger_channel(engine);

        // Slot empty → accepted. Two more during the pending window → coalesced.
        assert!(handle.trigger());
        assert!(!handle.trigger());
        assert!(!handle.trigger());

        // Exactly one cycle runs for the burst...
        assert!(runner.run_next().await);
        // ...and nothing is left pending afterwards.
        let idle = tokio::time::timeout(Duration::from_millis(50), runner.run_next()).await;
        assert!(idle.is_err());
        // The slot is free again for the next burst.
        assert!(handle.trigger());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn sequential_cycles_only_dispatch_new_transitions() {
        let (dir, engine, transport) = setup(
            "sequential",
            "name,email,role,status\nA,a@x.com,Intern,Offered\nB,b@x.com,Intern,Screening\n",
        );
        let (handle, mut runner) = trigger_channel(engine);

        handle.trigger();
        runner.run_next().await;
        assert_eq!(*transport.sent.lock().unwrap(), vec!["a@x.com"]);

        // The file is rewritten wholesale: B transitions, A stays Offered.
        std::fs::write(
            dir.join("candidates.csv"),
            "name,email,role,status\nA,a@x.com,Intern,Offered\nB,b@x.com,Intern,Offered\n",
        )
        .unwrap();
        handle.trigger();
        runner.run_next().await;
        assert_eq!(*transport.sent.lock().unwrap(), vec!["a@x.com", "b@x.com"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn failed_cycle_returns_runner_to_idle_and_retries() {
        let (dir, engine, transport) = setup(
            "retry",
            "name,email,role,status\nA,a@x.com,Intern,Offered\n",
        );
        let source_path = dir.join("candidates.csv");
        let contents = std::fs::read_to_string(&source_path).unwrap();
        std::fs::remove_file(&source_path).unwrap();

        let (handle, mut runner) = trigger_channel(engine.clone());
        handle.trigger();
        runner.run_next().await; // SourceRead — reported, nothing sent
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(engine.lock().await.state(), crate::engine::CycleState::Idle);

        // Next trigger after the file is back succeeds.
        std::fs::write(&source_path, contents).unwrap();
        handle.trigger();
        runner.run_next().await;
        assert_eq!(*transport.sent.lock().unwrap(), vec!["a@x.com"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn fingerprint_tracks_rewrites() {
        let dir = std::env::temp_dir().join("offerwatch-watcher-fp");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("source.csv");

        std::fs::remove_file(&path).ok();
        assert!(fingerprint(&path).is_none());

        std::fs::write(&path, "name,email,role,status\n").unwrap();
        let first = fingerprint(&path);
        assert!(first.is_some());

        std::fs::write(&path, "name,email,role,status\nA,a@x.com,Intern,Offered\n").unwrap();
        assert_ne!(fingerprint(&path), first);
        std::fs::remove_dir_all(&dir).ok();
    }
}

//! # Offerwatch Engine
//!
//! The change-detection and dispatch core. The backing candidate file is
//! rewritten wholesale between observations, so each cycle re-reads the
//! whole file and diffs it against the ledger-derived notified set — never
//! against the previous in-memory snapshot.
//!
//! ## Architecture
//! ```text
//! SourceWatcher (tokio interval: mtime poll or fixed period)
//!   └── trigger → CycleRunner (one cycle at a time, one pending retrigger)
//!         ├── Loading:     snapshot::load  — full re-read, validated rows
//!         ├── Detecting:   detector::detect — snapshot vs notified set
//!         └── Dispatching: Dispatcher — template → render → send → ledger
//!                            ├── TemplateStore (role → body, default fallback)
//!                            ├── Personalizer  (fixed placeholder set)
//!                            ├── Transport     (capability, offerwatch-transport)
//!                            └── Ledger        (append-only SQLite + CSV export)
//! ```

pub mod detector;
pub mod dispatcher;
pub mod engine;
pub mod ledger;
pub mod personalize;
pub mod snapshot;
pub mod templates;
pub mod watcher;

pub use detector::{StatusMatcher, detect};
pub use dispatcher::Dispatcher;
pub use engine::{CycleState, Engine};
pub use ledger::Ledger;
pub use snapshot::Snapshot;
pub use templates::TemplateStore;
pub use watcher::{CycleRunner, TriggerHandle, trigger_channel};

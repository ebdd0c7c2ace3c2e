//! # Offerwatch Core
//!
//! Shared foundation for the Offerwatch workspace: the candidate data
//! model, the central error enum, TOML configuration, and the transport
//! capability trait. No I/O beyond config loading lives here — the engine
//! and transport crates build on these types.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::OfferwatchConfig;
pub use error::{OfferwatchError, Result};
pub use traits::Transport;
pub use types::{CandidateRecord, CycleSummary, DispatchOutcome, Identity, LedgerEntry};

//! Capability seams the engine depends on.

use async_trait::async_trait;

use crate::error::Result;

/// Abstract "send one message" boundary.
///
/// The engine never talks to a mail system directly — it only sees this
/// capability. Realizations (SMTP relay, file outbox) live in
/// `offerwatch-transport`; tests substitute their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short realization name for logs and ledger remarks.
    fn name(&self) -> &str;

    /// Deliver one message to `to`. The error carries the human-readable
    /// failure reason that ends up in the ledger.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

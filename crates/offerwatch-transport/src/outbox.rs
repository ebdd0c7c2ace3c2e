//! File outbox transport — writes one .eml per message instead of
//! talking to a mail server.
//!
//! Serves two jobs: the dry-run mode of the CLI, and the review flow
//! where an operator (or a desktop mail client picking up the directory)
//! sends the composed messages out-of-band.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::{AsyncFileTransport, AsyncTransport, Tokio1Executor};
use offerwatch_core::{OfferwatchError, Result, Transport};

use crate::{build_message, from_mailbox};

/// Fallback From address when the configuration leaves it empty — the
/// outbox never authenticates, so any syntactically valid sender works.
const DEFAULT_FROM: &str = "offerwatch@localhost";

pub struct OutboxTransport {
    dir: PathBuf,
    from: Mailbox,
    inner: AsyncFileTransport<Tokio1Executor>,
}

impl OutboxTransport {
    /// Create the outbox directory if needed.
    pub fn new(dir: &Path, from_email: &str, display_name: Option<&str>) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let effective = if from_email.is_empty() {
            DEFAULT_FROM
        } else {
            from_email
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            from: from_mailbox(display_name, effective)?,
            inner: AsyncFileTransport::new(dir),
        })
    }
}

#[async_trait]
impl Transport for OutboxTransport {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = build_message(&self.from, to, subject, body)?;
        self.inner
            .send(email)
            .await
            .map_err(|e| OfferwatchError::Transport(format!("outbox write: {e}")))?;
        tracing::info!("📥 Message for {to} dropped in {}", self.dir.display());
        Ok(())
    }
}

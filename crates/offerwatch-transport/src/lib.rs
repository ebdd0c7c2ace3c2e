//! # Offerwatch Transport
//!
//! Realizations of the [`offerwatch_core::Transport`] capability. The
//! engine only ever sees the trait; which realization is wired in is a
//! configuration decision made at startup.

pub mod outbox;
pub mod smtp;

pub use outbox::OutboxTransport;
pub use smtp::SmtpTransport;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::Message;
use offerwatch_core::{OfferwatchError, Result};

/// Build one plain-text message. Shared by every realization so the wire
/// form does not depend on which transport delivers it.
pub(crate) fn build_message(
    from: &Mailbox,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<Message> {
    let to_mailbox: Mailbox = to
        .parse()
        .map_err(|e| OfferwatchError::Transport(format!("invalid recipient '{to}': {e}")))?;
    Message::builder()
        .from(from.clone())
        .to(to_mailbox)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| OfferwatchError::Transport(format!("build message: {e}")))
}

/// Parse the configured From mailbox, with an optional display name.
pub(crate) fn from_mailbox(display_name: Option<&str>, email: &str) -> Result<Mailbox> {
    let raw = match display_name {
        Some(name) => format!("{name} <{email}>"),
        None => email.to_string(),
    };
    raw.parse()
        .map_err(|e| OfferwatchError::Transport(format!("invalid from address '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_recipient() {
        let from = from_mailbox(None, "hr@example.com").unwrap();
        let err = build_message(&from, "not-an-address", "Subject", "Body").unwrap_err();
        assert!(matches!(err, OfferwatchError::Transport(_)));
    }

    #[test]
    fn from_mailbox_carries_display_name() {
        let mb = from_mailbox(Some("HR Team"), "hr@example.com").unwrap();
        let shown = mb.to_string();
        assert!(shown.contains("HR Team"));
        assert!(shown.contains("hr@example.com"));
    }
}

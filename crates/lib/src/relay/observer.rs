//! Observability sink for relay decisions.
//!
//! Every branch of the per-message procedure emits one [`RelayEvent`]. [`LogObserver`]
//! writes them as `key=value` log lines; tests plug in a recording observer.

use crate::relay::outcome::Rejection;

/// One decision taken for an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent<'a> {
    Received {
        conversation_id: i64,
        sender: &'a str,
        text: &'a str,
    },
    Ignored {
        sender: &'a str,
    },
    EmptyCommand {
        sender: &'a str,
        prefix: &'a str,
    },
    Forwarded {
        sender: &'a str,
        target_channel_id: i64,
        content: &'a str,
    },
    Rejected {
        sender: &'a str,
        target_channel_id: i64,
        rejection: &'a Rejection,
    },
}

impl RelayEvent<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::Received { .. } => "received",
            RelayEvent::Ignored { .. } => "ignored",
            RelayEvent::EmptyCommand { .. } => "empty-command",
            RelayEvent::Forwarded { .. } => "forwarded",
            RelayEvent::Rejected { .. } => "rejected",
        }
    }
}

/// Receives relay events. Called from concurrent handler tasks.
pub trait RelayObserver: Send + Sync {
    fn record(&self, event: &RelayEvent<'_>);
}

/// Writes each event through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl RelayObserver for LogObserver {
    fn record(&self, event: &RelayEvent<'_>) {
        let kind = event.kind();
        match event {
            RelayEvent::Received {
                conversation_id,
                sender,
                text,
            } => log::info!(
                "event={} conversation={} sender={} text={:?}",
                kind,
                conversation_id,
                sender,
                text
            ),
            RelayEvent::Ignored { sender } => log::debug!("event={} sender={}", kind, sender),
            RelayEvent::EmptyCommand { sender, prefix } => log::info!(
                "event={} sender={} prefix={:?} no content to forward",
                kind,
                sender,
                prefix
            ),
            RelayEvent::Forwarded {
                sender,
                target_channel_id,
                content,
            } => log::info!(
                "event={} sender={} target={} content={:?}",
                kind,
                sender,
                target_channel_id,
                content
            ),
            RelayEvent::Rejected {
                sender,
                target_channel_id,
                rejection,
            } => log::warn!(
                "event={} sender={} target={} reason={} detail={:?}",
                kind,
                sender,
                target_channel_id,
                rejection.reason(),
                rejection.detail().unwrap_or("")
            ),
        }
    }
}

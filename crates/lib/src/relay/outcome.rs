//! Per-message outcome and publish-failure classification.

use crate::transport::PublishError;
use std::fmt;

/// Why a publish was rejected. Terminal for the message: no retry, no requeue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Forbidden,
    Blocked,
    BackendError(String),
    Unknown(String),
}

impl Rejection {
    /// Stable reason tag used in log events.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Forbidden => "forbidden",
            Rejection::Blocked => "blocked",
            Rejection::BackendError(_) => "backend-error",
            Rejection::Unknown(_) => "unknown",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Rejection::Forbidden | Rejection::Blocked => None,
            Rejection::BackendError(d) | Rejection::Unknown(d) => Some(d),
        }
    }
}

impl From<PublishError> for Rejection {
    fn from(e: PublishError) -> Self {
        match e {
            PublishError::Forbidden => Rejection::Forbidden,
            PublishError::Blocked => Rejection::Blocked,
            e @ PublishError::Backend { .. } => Rejection::BackendError(e.to_string()),
            PublishError::Other(detail) => Rejection::Unknown(detail),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(d) => write!(f, "{}: {}", self.reason(), d),
            None => f.write_str(self.reason()),
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command.
    Ignored,
    /// Command with nothing to forward.
    EmptyCommand,
    /// Published to the target channel.
    Sent,
    Rejected(Rejection),
}

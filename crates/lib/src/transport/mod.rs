//! Messaging-platform transport.
//!
//! [`Transport`] is the seam between the relay and the platform session (connect,
//! sign-in, subscribe, publish). Backend failures are reported through closed enums
//! so callers classify them with an exhaustive match. The Telegram implementation
//! lives behind the `telegram` feature.

mod inbound;
#[cfg(feature = "telegram")]
mod telegram;

pub use inbound::InboundMessage;
#[cfg(feature = "telegram")]
pub use telegram::TelegramTransport;

use crate::config::RelaySettings;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Connection-level failures (not tied to a single sign-in or publish call).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("transport request failed: {0}")]
    Request(String),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("connection lost: {0}")]
    Disconnected(String),
}

/// Inbound messages of one conversation. A lost connection arrives as a final `Err`; a
/// receiver that simply closes means the session ended normally.
pub type Subscription = mpsc::Receiver<Result<InboundMessage, TransportError>>;

/// Outcome of a sign-in step that did not authorize the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignInError {
    #[error("the code entered is invalid or expired")]
    InvalidCode,
    #[error("two-factor authentication password required")]
    PasswordRequired,
    #[error("the password entered is invalid")]
    InvalidPassword,
    #[error("the phone number is not registered")]
    UnregisteredPhone,
    #[error("{0}")]
    Other(String),
}

/// Why a publish to the target channel failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The account may not write to the target.
    #[error("writing to the target is forbidden")]
    Forbidden,
    /// The account or the target has been blocked.
    #[error("blocked by the target")]
    Blocked,
    /// Any other protocol-level error returned by the backend.
    #[error("backend error {code}: {name}")]
    Backend { code: i32, name: String },
    /// Local or unexpected failure (I/O, peer resolution, ...).
    #[error("{0}")]
    Other(String),
}

/// Platform session used by the auth handshake and the relay pipeline.
///
/// Implementations must be safe to share between the handshake and the pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the network session (restoring a persisted one when present).
    async fn connect(&self) -> Result<(), TransportError>;

    /// True when the restored session is already signed in.
    async fn is_authorized(&self) -> Result<bool, TransportError>;

    /// Ask the platform to send a login code to `phone`.
    async fn request_code(&self, phone: &str) -> Result<(), TransportError>;

    /// Complete sign-in with the code from the last [`Transport::request_code`].
    async fn sign_in(&self, phone: &str, code: &str) -> Result<(), SignInError>;

    /// Complete sign-in with the two-factor password after [`SignInError::PasswordRequired`].
    async fn check_password(&self, password: &str) -> Result<(), SignInError>;

    /// Persist the session so the next start skips the handshake. Default is a no-op.
    async fn save_session(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Subscribe to new text messages in one conversation.
    async fn subscribe(&self, conversation_id: i64) -> Result<Subscription, TransportError>;

    /// Best-effort display name (username) of the message sender.
    async fn sender_name(&self, _message: &InboundMessage) -> Result<Option<String>, TransportError> {
        Ok(None)
    }

    /// Send `text` as a new message to `target_id`.
    async fn publish(&self, target_id: i64, text: &str) -> Result<(), PublishError>;
}

/// Build the platform transport for the resolved settings.
#[cfg(feature = "telegram")]
pub fn build_transport(settings: &RelaySettings) -> Result<Arc<dyn Transport>, TransportError> {
    Ok(Arc::new(TelegramTransport::new(
        settings.credentials.clone(),
        settings.session_file.clone(),
    )))
}

/// Build the platform transport for the resolved settings.
#[cfg(not(feature = "telegram"))]
pub fn build_transport(_settings: &RelaySettings) -> Result<Arc<dyn Transport>, TransportError> {
    Err(TransportError::Unavailable(
        "built without the `telegram` feature; rebuild with `cargo build --features telegram`"
            .to_string(),
    ))
}

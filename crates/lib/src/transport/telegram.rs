//! Telegram transport: wraps the `telegram-transport` user client behind [`Transport`].

use crate::config::Credentials;
use crate::transport::{
    InboundMessage, PublishError, SignInError, Subscription, Transport, TransportError,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use telegram_transport::{Error, LoginError, SendError, UserClient};
use tokio::sync::mpsc;

const INBOUND_BUFFER: usize = 256;

/// Telegram user-account transport. The session is persisted to `session_file`.
pub struct TelegramTransport {
    client: Arc<UserClient>,
}

impl TelegramTransport {
    pub fn new(credentials: Credentials, session_file: PathBuf) -> Self {
        Self {
            client: Arc::new(UserClient::new(
                credentials.api_id,
                credentials.api_hash,
                session_file,
            )),
        }
    }
}

fn transport_error(e: Error) -> TransportError {
    match e {
        Error::Connect(detail) => TransportError::Connect(detail),
        Error::NotConnected => TransportError::Unavailable(e.to_string()),
        Error::Session(_) | Error::Invocation(_) => TransportError::Request(e.to_string()),
        Error::Disconnected(detail) => TransportError::Disconnected(detail),
    }
}

fn sign_in_error(e: LoginError) -> SignInError {
    match e {
        LoginError::InvalidCode => SignInError::InvalidCode,
        LoginError::PasswordRequired => SignInError::PasswordRequired,
        LoginError::InvalidPassword => SignInError::InvalidPassword,
        LoginError::Unregistered => SignInError::UnregisteredPhone,
        LoginError::Other(detail) => SignInError::Other(detail),
    }
}

fn publish_error(e: SendError) -> PublishError {
    match e {
        SendError::Forbidden => PublishError::Forbidden,
        SendError::Blocked => PublishError::Blocked,
        SendError::Rpc { code, name } => PublishError::Backend { code, name },
        SendError::Other(detail) => PublishError::Other(detail),
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.client.connect().await.map_err(transport_error)
    }

    async fn is_authorized(&self) -> Result<bool, TransportError> {
        self.client.is_authorized().await.map_err(transport_error)
    }

    async fn request_code(&self, phone: &str) -> Result<(), TransportError> {
        self.client
            .request_login_code(phone)
            .await
            .map_err(transport_error)
    }

    async fn sign_in(&self, _phone: &str, code: &str) -> Result<(), SignInError> {
        self.client.sign_in(code).await.map_err(sign_in_error)
    }

    async fn check_password(&self, password: &str) -> Result<(), SignInError> {
        self.client
            .check_password(password)
            .await
            .map_err(sign_in_error)
    }

    async fn save_session(&self) -> Result<(), TransportError> {
        self.client.save_session().map_err(transport_error)
    }

    async fn subscribe(&self, conversation_id: i64) -> Result<Subscription, TransportError> {
        let mut incoming = Arc::clone(&self.client)
            .subscribe(conversation_id)
            .map_err(transport_error)?;
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        tokio::spawn(async move {
            while let Some(next) = incoming.recv().await {
                // Report the configured id so downstream sees the id it subscribed with.
                let inbound = next
                    .map(|m| InboundMessage::new(conversation_id, m.sender_id, m.text))
                    .map_err(transport_error);
                if tx.send(inbound).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }

    async fn sender_name(&self, message: &InboundMessage) -> Result<Option<String>, TransportError> {
        Ok(message
            .sender_id
            .and_then(|id| self.client.username(id)))
    }

    async fn publish(&self, target_id: i64, text: &str) -> Result<(), PublishError> {
        self.client
            .send_text(target_id, text)
            .await
            .map_err(publish_error)
    }
}

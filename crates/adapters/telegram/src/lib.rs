//! Telegram user-account adapter (MTProto via grammers).
//!
//! Kept in its own crate so the MTProto stack is only compiled when `lib`'s `telegram`
//! feature is enabled. Exposes a small client with closed error enums; `lib` maps them
//! onto its transport seam.

use grammers_client::types::{LoginToken, PackedChat, PasswordToken};
use grammers_client::{Client, Config, InitParams, InvocationError, SignInError, Update};
use grammers_session::Session;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tokio::sync::mpsc;

const INBOUND_BUFFER: usize = 256;

/// Marked ids for supergroups and channels (Bot API style) are `-100` followed by the bare id.
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("client is not connected")]
    NotConnected,
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("session file error: {0}")]
    Session(String),
    #[error("telegram request failed: {0}")]
    Invocation(String),
    #[error("update stream ended: {0}")]
    Disconnected(String),
}

/// Failed sign-in step.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoginError {
    #[error("invalid code")]
    InvalidCode,
    #[error("password required")]
    PasswordRequired,
    #[error("invalid password")]
    InvalidPassword,
    #[error("phone number not registered")]
    Unregistered,
    #[error("{0}")]
    Other(String),
}

/// Failed send.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    #[error("chat write forbidden")]
    Forbidden,
    #[error("blocked")]
    Blocked,
    #[error("rpc error {code}: {name}")]
    Rpc { code: i32, name: String },
    #[error("{0}")]
    Other(String),
}

/// New text message from the subscribed chat.
#[derive(Debug, Clone)]
pub struct IncomingText {
    pub sender_id: Option<i64>,
    pub text: String,
}

/// Strip the Bot-API `-100` / `-` markers so ids compare with grammers' bare chat ids.
pub fn bare_chat_id(id: i64) -> i64 {
    if id <= -CHANNEL_ID_OFFSET {
        -id - CHANNEL_ID_OFFSET
    } else {
        id.abs()
    }
}

/// Telegram client logged in as a user account.
pub struct UserClient {
    api_id: i32,
    api_hash: String,
    session_file: PathBuf,
    client: OnceLock<Client>,
    login_token: Mutex<Option<LoginToken>>,
    password_token: Mutex<Option<PasswordToken>>,
    /// bare chat id -> packed chat, filled from the dialog list and incoming updates.
    chats: Mutex<HashMap<i64, PackedChat>>,
    /// sender id -> username, filled from incoming updates.
    usernames: Mutex<HashMap<i64, String>>,
}

impl UserClient {
    pub fn new(api_id: i32, api_hash: impl Into<String>, session_file: impl Into<PathBuf>) -> Self {
        Self {
            api_id,
            api_hash: api_hash.into(),
            session_file: session_file.into(),
            client: OnceLock::new(),
            login_token: Mutex::new(None),
            password_token: Mutex::new(None),
            chats: Mutex::new(HashMap::new()),
            usernames: Mutex::new(HashMap::new()),
        }
    }

    fn client(&self) -> Result<&Client, Error> {
        self.client.get().ok_or(Error::NotConnected)
    }

    /// Connect using the session file (created when missing). Calling twice is a no-op.
    pub async fn connect(&self) -> Result<(), Error> {
        if self.client.get().is_some() {
            return Ok(());
        }
        if let Some(parent) = self.session_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::Session(e.to_string()))?;
        }
        let session = Session::load_file_or_create(&self.session_file)
            .map_err(|e| Error::Session(e.to_string()))?;
        log::info!("connecting to telegram (session {})", self.session_file.display());
        let client = Client::connect(Config {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| Error::Connect(e.to_string()))?;
        let _ = self.client.set(client);
        Ok(())
    }

    pub async fn is_authorized(&self) -> Result<bool, Error> {
        self.client()?
            .is_authorized()
            .await
            .map_err(|e| Error::Invocation(e.to_string()))
    }

    pub async fn request_login_code(&self, phone: &str) -> Result<(), Error> {
        let token = self
            .client()?
            .request_login_code(phone)
            .await
            .map_err(|e| Error::Invocation(e.to_string()))?;
        *lock(&self.login_token) = Some(token);
        Ok(())
    }

    pub async fn sign_in(&self, code: &str) -> Result<(), LoginError> {
        let client = self.client().map_err(|e| LoginError::Other(e.to_string()))?;
        let token = lock(&self.login_token)
            .take()
            .ok_or_else(|| LoginError::Other("no login code was requested".to_string()))?;
        match client.sign_in(&token, code).await {
            Ok(_) => Ok(()),
            Err(SignInError::PasswordRequired(password_token)) => {
                *lock(&self.password_token) = Some(password_token);
                Err(LoginError::PasswordRequired)
            }
            Err(e) => Err(login_error(e)),
        }
    }

    pub async fn check_password(&self, password: &str) -> Result<(), LoginError> {
        let client = self.client().map_err(|e| LoginError::Other(e.to_string()))?;
        let token = lock(&self.password_token)
            .take()
            .ok_or_else(|| LoginError::Other("no password was requested".to_string()))?;
        client
            .check_password(token, password)
            .await
            .map(|_| ())
            .map_err(login_error)
    }

    pub fn save_session(&self) -> Result<(), Error> {
        self.client()?
            .session()
            .save_to_file(&self.session_file)
            .map_err(|e| Error::Session(e.to_string()))
    }

    /// Start the update loop and forward new text messages from `chat_id` (bare or marked).
    /// A failing update stream is delivered as a final `Err` before the receiver closes.
    pub fn subscribe(
        self: std::sync::Arc<Self>,
        chat_id: i64,
    ) -> Result<mpsc::Receiver<Result<IncomingText, Error>>, Error> {
        let client = self.client()?.clone();
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let wanted = bare_chat_id(chat_id);
        log::info!("telegram: starting update loop for chat {}", wanted);
        tokio::spawn(async move {
            run_update_loop(self, client, wanted, tx).await;
        });
        Ok(rx)
    }

    pub fn username(&self, sender_id: i64) -> Option<String> {
        lock(&self.usernames).get(&sender_id).cloned()
    }

    /// Send a plain text message to `chat_id` (bare or marked).
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        let client = self.client().map_err(|e| SendError::Other(e.to_string()))?;
        let chat = self.resolve_chat(client, bare_chat_id(chat_id)).await?;
        client
            .send_message(chat, text)
            .await
            .map(|_| ())
            .map_err(send_error)
    }

    async fn resolve_chat(&self, client: &Client, bare_id: i64) -> Result<PackedChat, SendError> {
        if let Some(chat) = lock(&self.chats).get(&bare_id).copied() {
            return Ok(chat);
        }
        log::debug!("telegram: chat {} not cached, scanning dialogs", bare_id);
        let mut dialogs = client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.map_err(send_error)? {
            let chat = dialog.chat();
            let packed = chat.pack();
            lock(&self.chats).insert(chat.id(), packed);
            if chat.id() == bare_id {
                return Ok(packed);
            }
        }
        Err(SendError::Other(format!(
            "chat {} not found among the account's dialogs",
            bare_id
        )))
    }
}

async fn run_update_loop(
    owner: std::sync::Arc<UserClient>,
    client: Client,
    wanted: i64,
    tx: mpsc::Sender<Result<IncomingText, Error>>,
) {
    loop {
        let update = match client.next_update().await {
            Ok(u) => u,
            Err(e) => {
                log::debug!("telegram: update stream failed: {}", e);
                let _ = tx.send(Err(Error::Disconnected(e.to_string()))).await;
                return;
            }
        };
        let Update::NewMessage(message) = update else {
            continue;
        };
        let chat = message.chat();
        if chat.id() != wanted {
            continue;
        }
        lock(&owner.chats).insert(chat.id(), chat.pack());
        let sender = message.sender();
        let sender_id = sender.as_ref().map(|s| s.id());
        if let Some(s) = sender.as_ref() {
            if let Some(name) = s.username() {
                lock(&owner.usernames).insert(s.id(), name.to_string());
            }
        }
        let incoming = IncomingText {
            sender_id,
            text: message.text().to_string(),
        };
        if tx.send(Ok(incoming)).await.is_err() {
            log::debug!("telegram: inbound receiver dropped, stopping update loop");
            return;
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn login_error(e: SignInError) -> LoginError {
    match e {
        SignInError::InvalidCode => LoginError::InvalidCode,
        SignInError::InvalidPassword => LoginError::InvalidPassword,
        SignInError::SignUpRequired { .. } => LoginError::Unregistered,
        SignInError::PasswordRequired(_) => LoginError::PasswordRequired,
        SignInError::Other(InvocationError::Rpc(rpc))
            if rpc.name == "PHONE_NUMBER_UNOCCUPIED" =>
        {
            LoginError::Unregistered
        }
        SignInError::Other(InvocationError::Rpc(rpc)) if rpc.name.starts_with("PHONE_CODE_") => {
            LoginError::InvalidCode
        }
        SignInError::Other(InvocationError::Rpc(rpc)) if rpc.name == "PASSWORD_HASH_INVALID" => {
            LoginError::InvalidPassword
        }
        SignInError::Other(other) => LoginError::Other(other.to_string()),
    }
}

fn send_error(e: InvocationError) -> SendError {
    match e {
        InvocationError::Rpc(rpc) => match rpc.name.as_str() {
            "CHAT_WRITE_FORBIDDEN" | "CHAT_ADMIN_REQUIRED" | "CHAT_RESTRICTED" => {
                SendError::Forbidden
            }
            name if name.starts_with("CHAT_SEND_") && name.ends_with("_FORBIDDEN") => {
                SendError::Forbidden
            }
            "USER_IS_BLOCKED" | "YOU_BLOCKED_USER" | "USER_BANNED_IN_CHANNEL" => {
                SendError::Blocked
            }
            _ => SendError::Rpc {
                code: rpc.code,
                name: rpc.name,
            },
        },
        other => SendError::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_chat_id_strips_markers() {
        assert_eq!(bare_chat_id(-1001234567890), 1234567890);
        assert_eq!(bare_chat_id(-4567), 4567);
        assert_eq!(bare_chat_id(1234567890), 1234567890);
    }
}

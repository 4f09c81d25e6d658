//! Authentication handshake: drive the interactive login until the session is authorized.
//!
//! Single-shot by contract: an invalid code or password fails the handshake, there is no
//! retry loop. Operator input comes from a [`CredentialProvider`] so the handshake can be
//! driven by a console prompt or by a scripted provider.

use crate::config::Credentials;
use crate::transport::{SignInError, Transport, TransportError};
use async_trait::async_trait;
use std::sync::Arc;

/// Supplies the values only a human can provide during sign-in.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The login code delivered to the account's devices.
    async fn code(&self) -> Result<String, String>;
    /// The two-factor authentication password.
    async fn password(&self) -> Result<String, String>;
}

/// Why the handshake ended without an authorized session. Fatal for startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid code entered")]
    InvalidCode,
    #[error("invalid password entered")]
    InvalidPassword,
    #[error("the phone number {0} is not registered on Telegram")]
    UnregisteredPhone(String),
    #[error("reading operator input failed: {0}")]
    Prompt(String),
    #[error("sign in failed: {0}")]
    Other(String),
}

impl From<TransportError> for AuthError {
    fn from(e: TransportError) -> Self {
        AuthError::Other(e.to_string())
    }
}

/// Handshake progress. Owned by [`AuthSession`] and dropped once authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    CodeRequested,
    AwaitingPassword,
    Authorized,
    Failed(AuthError),
}

/// Authorized session handle. Only [`AuthSession`] creates one, so holding it proves the
/// handshake completed.
#[derive(Clone)]
pub struct AuthorizedConnection {
    transport: Arc<dyn Transport>,
}

impl AuthorizedConnection {
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

/// Drives the login state machine for one set of credentials.
pub struct AuthSession {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    state: AuthState,
}

impl AuthSession {
    pub fn new(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Connect and make sure the session is authorized, prompting for code and password
    /// when the platform asks for them. Ends in `Authorized` or `Failed`.
    pub async fn ensure_authorized(
        &mut self,
        provider: &dyn CredentialProvider,
    ) -> Result<AuthorizedConnection, AuthError> {
        match self.drive(provider).await {
            Ok(()) => {
                self.transition(AuthState::Authorized);
                Ok(AuthorizedConnection {
                    transport: Arc::clone(&self.transport),
                })
            }
            Err(e) => {
                self.transition(AuthState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    async fn drive(&mut self, provider: &dyn CredentialProvider) -> Result<(), AuthError> {
        self.transport.connect().await?;
        if self.transport.is_authorized().await? {
            log::info!("session already authorized");
            return Ok(());
        }

        log::info!("user is not authorized; requesting a login code");
        let phone = self.credentials.phone_number.clone();
        self.transport.request_code(&phone).await?;
        self.transition(AuthState::CodeRequested);

        let code = provider.code().await.map_err(AuthError::Prompt)?;
        match self.transport.sign_in(&phone, code.trim()).await {
            Ok(()) => {}
            Err(SignInError::PasswordRequired) => {
                self.transition(AuthState::AwaitingPassword);
                let password = provider.password().await.map_err(AuthError::Prompt)?;
                self.transport
                    .check_password(&password)
                    .await
                    .map_err(|e| self.classify(e))?;
            }
            Err(e) => return Err(self.classify(e)),
        }

        log::info!("signed in successfully");
        if let Err(e) = self.transport.save_session().await {
            log::warn!("could not persist session, the next start will ask to sign in again: {}", e);
        }
        Ok(())
    }

    fn classify(&self, e: SignInError) -> AuthError {
        match e {
            SignInError::InvalidCode => AuthError::InvalidCode,
            SignInError::InvalidPassword => AuthError::InvalidPassword,
            SignInError::UnregisteredPhone => {
                AuthError::UnregisteredPhone(self.credentials.phone_number.clone())
            }
            SignInError::PasswordRequired => {
                AuthError::Other("password requested again after password step".to_string())
            }
            SignInError::Other(detail) => AuthError::Other(detail),
        }
    }

    fn transition(&mut self, next: AuthState) {
        log::debug!("auth state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

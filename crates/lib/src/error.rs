//! Startup error: everything that stops the relay before the message loop runs.

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(#[from] ConfigError),
    #[error("authorization failed: {0}")]
    AuthFailed(#[from] AuthError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

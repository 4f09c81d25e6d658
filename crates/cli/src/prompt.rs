//! Console credential prompt for the sign-in handshake.

use async_trait::async_trait;
use dialoguer::{Input, Password};
use lib::auth::CredentialProvider;

/// Reads the login code and two-factor password from the terminal.
pub struct ConsolePrompt;

#[async_trait]
impl CredentialProvider for ConsolePrompt {
    async fn code(&self) -> Result<String, String> {
        blocking(|| {
            Input::<String>::new()
                .with_prompt("Enter the code sent to Telegram")
                .interact_text()
        })
        .await
    }

    async fn password(&self) -> Result<String, String> {
        blocking(|| {
            Password::new()
                .with_prompt("Two-factor authentication is enabled. Please enter your password")
                .interact()
        })
        .await
    }
}

/// Terminal reads block; keep them off the async workers.
async fn blocking<F>(read: F) -> Result<String, String>
where
    F: FnOnce() -> dialoguer::Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

//! Process composition: validate config, authorize, then relay until disconnected.

use crate::auth::{AuthSession, CredentialProvider};
use crate::config::{self, Config, RelaySettings};
use crate::error::Error;
use crate::relay::{RelayObserver, RelayPipeline};
use crate::transport::{Transport, TransportError};
use std::path::Path;
use std::sync::Arc;

/// Validate `config`, build the transport with `make_transport`, run the handshake and then the
/// relay. Returns when the subscription closes. Nothing is constructed or connected unless the
/// configuration is valid, and the relay never starts unless the handshake succeeded.
pub async fn run_relay<F>(
    config: &Config,
    config_path: &Path,
    make_transport: F,
    provider: &dyn CredentialProvider,
    observer: Arc<dyn RelayObserver>,
) -> Result<(), Error>
where
    F: FnOnce(&RelaySettings) -> Result<Arc<dyn Transport>, TransportError>,
{
    let settings = config::resolve_settings(config, config_path)?;
    run_with_settings(settings, make_transport, provider, observer).await
}

/// [`run_relay`] for settings that were already resolved.
pub async fn run_with_settings<F>(
    settings: RelaySettings,
    make_transport: F,
    provider: &dyn CredentialProvider,
    observer: Arc<dyn RelayObserver>,
) -> Result<(), Error>
where
    F: FnOnce(&RelaySettings) -> Result<Arc<dyn Transport>, TransportError>,
{
    let transport = make_transport(&settings)?;
    let mut session = AuthSession::new(transport, settings.credentials.clone());
    let connection = session.ensure_authorized(provider).await?;
    log::info!("relay started");

    let pipeline = RelayPipeline::new(connection, Arc::new(settings.route), observer);
    pipeline.run().await?;
    log::info!("connection closed, relay stopped");
    Ok(())
}

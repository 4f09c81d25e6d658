//! Filter-and-forward engine over an authorized connection.

use crate::auth::AuthorizedConnection;
use crate::config::RouteConfig;
use crate::relay::filter::{parse_command, Command};
use crate::relay::observer::{RelayEvent, RelayObserver};
use crate::relay::outcome::{Outcome, Rejection};
use crate::transport::{InboundMessage, TransportError};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

/// Display name used when the sender cannot be resolved.
pub const UNKNOWN_SENDER: &str = "N/A";

/// Relays command messages from the source conversation to the target channel.
///
/// Each message is handled on its own task. Handlers wait for the previous message before
/// publishing, so forwarded content reaches the target in arrival order. A rejected publish
/// only affects its own message.
#[derive(Clone)]
pub struct RelayPipeline {
    connection: AuthorizedConnection,
    route: Arc<RouteConfig>,
    observer: Arc<dyn RelayObserver>,
}

impl RelayPipeline {
    pub fn new(
        connection: AuthorizedConnection,
        route: Arc<RouteConfig>,
        observer: Arc<dyn RelayObserver>,
    ) -> Self {
        Self {
            connection,
            route,
            observer,
        }
    }

    /// Subscribe to the source conversation and handle messages until the subscription
    /// closes. A lost connection is returned as an error.
    pub async fn run(self) -> Result<(), TransportError> {
        let source = self.route.source_conversation_id();
        let mut inbound = self.connection.transport().subscribe(source).await?;
        log::info!(
            "listening for command {:?} in group {}",
            self.route.command_prefix(),
            source
        );
        log::info!("forwarding to channel {}", self.route.target_channel_id());

        let mut in_flight = JoinSet::new();
        let mut previous: Option<oneshot::Receiver<()>> = None;
        let ended = loop {
            let message = match inbound.recv().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            };
            // `done` is dropped when this handler finishes, releasing the next one.
            let (done, next_turn) = oneshot::channel::<()>();
            let turn = previous.replace(next_turn);
            let pipeline = self.clone();
            in_flight.spawn(async move {
                let outcome = pipeline.handle_in_turn(message, turn).await;
                drop(done);
                outcome
            });
            while let Some(finished) = in_flight.try_join_next() {
                report_join(finished);
            }
        };

        log::info!(
            "subscription to group {} closed; {} handler(s) still running",
            source,
            in_flight.len()
        );
        while let Some(finished) = in_flight.join_next().await {
            report_join(finished);
        }
        ended
    }

    /// Run the per-message procedure: resolve sender, match prefix, publish at most once.
    pub async fn handle(&self, message: InboundMessage) -> Outcome {
        self.handle_in_turn(message, None).await
    }

    /// [`RelayPipeline::handle`], deciding only after the previous handler released `turn`.
    async fn handle_in_turn(
        &self,
        message: InboundMessage,
        turn: Option<oneshot::Receiver<()>>,
    ) -> Outcome {
        let sender = self.sender_name(&message).await;
        let command = parse_command(&message.text, self.route.command_prefix());
        if let Some(turn) = turn {
            // Err only means the previous handler is gone, which also releases us.
            let _ = turn.await;
        }
        self.observer.record(&RelayEvent::Received {
            conversation_id: message.conversation_id,
            sender: &sender,
            text: &message.text,
        });

        let content = match command {
            Command::NotCommand => {
                self.observer.record(&RelayEvent::Ignored { sender: &sender });
                return Outcome::Ignored;
            }
            Command::Empty => {
                self.observer.record(&RelayEvent::EmptyCommand {
                    sender: &sender,
                    prefix: self.route.command_prefix(),
                });
                return Outcome::EmptyCommand;
            }
            Command::Forward(content) => content,
        };

        let target = self.route.target_channel_id();
        match self.connection.transport().publish(target, content).await {
            Ok(()) => {
                self.observer.record(&RelayEvent::Forwarded {
                    sender: &sender,
                    target_channel_id: target,
                    content,
                });
                Outcome::Sent
            }
            Err(e) => {
                let rejection = Rejection::from(e);
                self.observer.record(&RelayEvent::Rejected {
                    sender: &sender,
                    target_channel_id: target,
                    rejection: &rejection,
                });
                Outcome::Rejected(rejection)
            }
        }
    }

    async fn sender_name(&self, message: &InboundMessage) -> String {
        match self.connection.transport().sender_name(message).await {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            Ok(_) => UNKNOWN_SENDER.to_string(),
            Err(e) => {
                log::debug!("could not resolve sender: {}", e);
                UNKNOWN_SENDER.to_string()
            }
        }
    }
}

fn report_join(finished: Result<Outcome, tokio::task::JoinError>) {
    if let Err(e) = finished {
        log::error!("relay handler task failed: {}", e);
    }
}

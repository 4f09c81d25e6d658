//! Scripted transport and recording observer shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lib::auth::{AuthSession, AuthorizedConnection, CredentialProvider};
use lib::config::Credentials;
use lib::relay::{RelayEvent, RelayObserver};
use lib::transport::{
    InboundMessage, PublishError, SignInError, Subscription, Transport, TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const SOURCE: i64 = -1001111111111;
pub const TARGET: i64 = -1002222222222;

/// In-memory transport: replays a fixed list of inbound messages, then closes the subscription.
pub struct FakeTransport {
    authorized: bool,
    sign_in: Result<(), SignInError>,
    inbound: Mutex<Vec<InboundMessage>>,
    disconnect: Mutex<Option<TransportError>>,
    publish_delays: HashMap<String, Duration>,
    publish_results: Mutex<VecDeque<Result<(), PublishError>>>,
    senders: HashMap<i64, String>,
    pub connects: AtomicUsize,
    pub code_requests: AtomicUsize,
    pub subscriptions: Mutex<Vec<i64>>,
    pub published: Mutex<Vec<(i64, String)>>,
}

impl FakeTransport {
    pub fn authorized() -> Self {
        Self {
            authorized: true,
            sign_in: Ok(()),
            inbound: Mutex::new(Vec::new()),
            disconnect: Mutex::new(None),
            publish_delays: HashMap::new(),
            publish_results: Mutex::new(VecDeque::new()),
            senders: HashMap::new(),
            connects: AtomicUsize::new(0),
            code_requests: AtomicUsize::new(0),
            subscriptions: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn unauthorized(sign_in: Result<(), SignInError>) -> Self {
        Self {
            authorized: false,
            sign_in,
            ..Self::authorized()
        }
    }

    /// Messages delivered to the subscriber, in order, from sender 7.
    pub fn with_messages(self, texts: &[&str]) -> Self {
        *self.inbound.lock().unwrap() = texts
            .iter()
            .map(|t| InboundMessage::new(SOURCE, Some(7), *t))
            .collect();
        self
    }

    /// Results returned by successive publish calls; `Ok(())` once exhausted.
    pub fn with_publish_results(self, results: Vec<Result<(), PublishError>>) -> Self {
        *self.publish_results.lock().unwrap() = results.into();
        self
    }

    /// End the subscription with `error` after the scripted messages.
    pub fn with_disconnect(self, error: TransportError) -> Self {
        *self.disconnect.lock().unwrap() = Some(error);
        self
    }

    /// Delay the publish of `text` by `delay` before it is recorded.
    pub fn with_publish_delay(mut self, text: &str, delay: Duration) -> Self {
        self.publish_delays.insert(text.to_string(), delay);
        self
    }

    pub fn with_sender(mut self, id: i64, name: &str) -> Self {
        self.senders.insert(id, name.to_string());
        self
    }

    pub fn published(&self) -> Vec<(i64, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn is_authorized(&self) -> Result<bool, TransportError> {
        Ok(self.authorized)
    }

    async fn request_code(&self, _phone: &str) -> Result<(), TransportError> {
        self.code_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_in(&self, _phone: &str, _code: &str) -> Result<(), SignInError> {
        self.sign_in.clone()
    }

    async fn check_password(&self, _password: &str) -> Result<(), SignInError> {
        Err(SignInError::InvalidPassword)
    }

    async fn subscribe(&self, conversation_id: i64) -> Result<Subscription, TransportError> {
        self.subscriptions.lock().unwrap().push(conversation_id);
        let messages = std::mem::take(&mut *self.inbound.lock().unwrap());
        let disconnect = self.disconnect.lock().unwrap().take();
        let (tx, rx) = mpsc::channel(messages.len() + 1);
        for m in messages {
            tx.try_send(Ok(m)).expect("buffer sized for all messages");
        }
        if let Some(e) = disconnect {
            tx.try_send(Err(e)).expect("buffer sized for the final error");
        }
        Ok(rx)
    }

    async fn sender_name(&self, message: &InboundMessage) -> Result<Option<String>, TransportError> {
        match message.sender_id {
            Some(id) if self.senders.contains_key(&id) => Ok(self.senders.get(&id).cloned()),
            Some(_) => Err(TransportError::Request("user lookup failed".to_string())),
            None => Ok(None),
        }
    }

    async fn publish(&self, target_id: i64, text: &str) -> Result<(), PublishError> {
        if let Some(delay) = self.publish_delays.get(text) {
            tokio::time::sleep(*delay).await;
        }
        self.published
            .lock()
            .unwrap()
            .push((target_id, text.to_string()));
        self.publish_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// Observer that keeps `kind` plus the sender of every event.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<(String, String)>>,
}

impl RecordingObserver {
    pub fn kinds(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().iter().filter(|k| *k == kind).count()
    }
}

impl RelayObserver for RecordingObserver {
    fn record(&self, event: &RelayEvent<'_>) {
        let sender = match event {
            RelayEvent::Received { sender, .. }
            | RelayEvent::Ignored { sender }
            | RelayEvent::EmptyCommand { sender, .. }
            | RelayEvent::Forwarded { sender, .. }
            | RelayEvent::Rejected { sender, .. } => sender.to_string(),
        };
        self.events
            .lock()
            .unwrap()
            .push((event.kind().to_string(), sender));
    }
}

/// Provider for sessions that must never prompt.
pub struct NoPrompt;

#[async_trait]
impl CredentialProvider for NoPrompt {
    async fn code(&self) -> Result<String, String> {
        Ok("12345".to_string())
    }
    async fn password(&self) -> Result<String, String> {
        Ok("secret".to_string())
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        api_id: 1,
        api_hash: "hash".to_string(),
        phone_number: "+15550100".to_string(),
    }
}

/// Authorize `transport` (already signed in) and hand back the connection.
pub async fn connect(transport: Arc<FakeTransport>) -> AuthorizedConnection {
    let mut session = AuthSession::new(transport, credentials());
    match session.ensure_authorized(&NoPrompt).await {
        Ok(c) => c,
        Err(e) => panic!("fake transport should authorize: {}", e),
    }
}

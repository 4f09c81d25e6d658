//! Inbound message from the subscribed conversation: delivered to the relay pipeline.

/// One text message received in the source conversation. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub conversation_id: i64,
    /// Sender account id when the platform reports one (anonymous admins and channel posts have none).
    pub sender_id: Option<i64>,
    pub text: String,
}

impl InboundMessage {
    pub fn new(conversation_id: i64, sender_id: Option<i64>, text: impl Into<String>) -> Self {
        Self {
            conversation_id,
            sender_id,
            text: text.into(),
        }
    }
}

//! Inbound webhook payload: one POST from LINE carries a batch of events.

use serde::Deserialize;

/// Body of one webhook POST: a batch of events for this bot.
#[derive(Debug, Deserialize)]
pub struct WebhookDelivery {
    /// Bot user id the delivery is addressed to.
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// One platform event. Only `type == "message"` with a text message body is
/// actionable; everything else is skipped silently.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub typ: String,
    /// Opaque handle required to send a correlated reply. Absent on events
    /// that cannot be replied to (e.g. unsend).
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

/// Message body of a message event (text, image, sticker, ...).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl WebhookEvent {
    /// Text payload when this is an actionable text-message event, else None.
    pub fn text(&self) -> Option<&str> {
        if self.typ != "message" {
            return None;
        }
        let msg = self.message.as_ref()?;
        if msg.typ != "text" {
            return None;
        }
        msg.text.as_deref()
    }
}

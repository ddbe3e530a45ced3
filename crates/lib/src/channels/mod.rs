//! LINE Messaging API channel.
//!
//! Webhook payload types, the reply client, and signature verification so the
//! gateway can authenticate deliveries and send correlated replies.

mod inbound;
mod line;
mod signature;

pub use inbound::{EventMessage, WebhookDelivery, WebhookEvent};
pub use line::{LineClient, LineError, ReplySender};
pub use signature::{sign_body, verify_signature};

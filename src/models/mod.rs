pub mod webhook;
pub mod interaction;

pub use webhook::{InboundMessage, OutboundReply, WebhookPayload};
pub use interaction::{InteractionRecord, InteractionStats, SenderSummary, ProvisionedResource};

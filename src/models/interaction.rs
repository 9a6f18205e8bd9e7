use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct InteractionRecord {
    pub text: String,
    pub intent: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SenderSummary {
    pub sender: String,
    pub message_count: usize,
    pub last_message: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionStats {
    pub total_senders: usize,
    pub total_messages: usize,
    pub intents: BTreeMap<String, usize>,
    pub senders: Vec<SenderSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedResource {
    pub sender: String,
    pub spreadsheet_id: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

//! Test doubles and fixtures shared by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::config::{Config, DispatchMode, WhatsAppSettings};
use crate::models::webhook::MessageKind;
use crate::models::{InboundMessage, OutboundReply, ProvisionedResource};
use crate::services::reply::Clock;
use crate::services::sheets::{Provisioner, ProvisioningError};
use crate::services::whatsapp::{Messenger, MessagingError, SendReceipt};

pub const VERIFY_TOKEN: &str = "test-verify-token";

pub fn config() -> Config {
    Config {
        port: 0,
        verify_token: VERIFY_TOKEN.to_string(),
        whatsapp: WhatsAppSettings {
            access_token: Some("token".to_string()),
            phone_number_id: Some("5550001".to_string()),
            api_base: "http://127.0.0.1:1".to_string(),
            api_version: "v23.0".to_string(),
        },
        provisioning: None,
        business_name: "RealtyReach".to_string(),
        clock: Clock::Fixed(10),
        dispatch_mode: DispatchMode::Await,
        apology_on_failure: false,
    }
}

pub fn text_message(from: &str, text: &str) -> InboundMessage {
    InboundMessage {
        id: None,
        from: from.to_string(),
        text: text.to_string(),
        kind: MessageKind::Text,
        timestamp: None,
        contact_name: None,
        raw: json!({"from": from, "type": "text", "text": {"body": text}}),
    }
}

pub fn text_delivery(from: &str, text: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "102290129340398",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"display_phone_number": "15550001", "phone_number_id": "5550001"},
                    "contacts": [{"profile": {"name": "Test User"}, "wa_id": from}],
                    "messages": [{
                        "from": from,
                        "id": "wamid.HBgLMTIzNDU2Nzg5MBUCABIYFDNB",
                        "timestamp": "1700000000",
                        "type": "text",
                        "text": {"body": text}
                    }]
                }
            }]
        }]
    })
}

/// Ordered record of collaborator calls, shared between doubles.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub struct RecordingMessenger {
    fail: bool,
    attempted: Mutex<Vec<OutboundReply>>,
    events: EventLog,
}

impl RecordingMessenger {
    pub fn new() -> Arc<Self> {
        Self::with_events(EventLog::default())
    }

    pub fn with_events(events: EventLog) -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            attempted: Mutex::new(Vec::new()),
            events,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            attempted: Mutex::new(Vec::new()),
            events: EventLog::default(),
        })
    }

    pub fn attempted(&self) -> Vec<OutboundReply> {
        self.attempted.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempted.lock().unwrap().len()
    }

    /// Successfully delivered replies.
    pub fn sent(&self) -> Vec<OutboundReply> {
        if self.fail {
            Vec::new()
        } else {
            self.attempted()
        }
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, reply: &OutboundReply) -> Result<SendReceipt, MessagingError> {
        self.events.push(format!("send:{}", reply.to));
        let count = {
            let mut attempted = self.attempted.lock().unwrap();
            attempted.push(reply.clone());
            attempted.len()
        };
        if self.fail {
            return Err(MessagingError::Api {
                status: 500,
                body: "stub failure".to_string(),
            });
        }
        Ok(SendReceipt {
            message_id: Some(format!("wamid.test.{}", count)),
        })
    }
}

pub struct StubProvisioner {
    link: Option<String>,
    calls: Mutex<Vec<String>>,
    events: EventLog,
}

impl StubProvisioner {
    pub fn with_events(link: &str, events: EventLog) -> Arc<Self> {
        Arc::new(Self {
            link: Some(link.to_string()),
            calls: Mutex::new(Vec::new()),
            events,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            link: None,
            calls: Mutex::new(Vec::new()),
            events: EventLog::default(),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for StubProvisioner {
    async fn provision(&self, sender: &str) -> Result<ProvisionedResource, ProvisioningError> {
        self.events.push(format!("provision:{}", sender));
        self.calls.lock().unwrap().push(sender.to_string());
        match &self.link {
            Some(link) => Ok(ProvisionedResource {
                sender: sender.to_string(),
                spreadsheet_id: "stub-sheet".to_string(),
                link: link.clone(),
                created_at: Utc::now(),
            }),
            None => Err(ProvisioningError::Api {
                operation: "spreadsheet create",
                status: 403,
                body: "quota exceeded".to_string(),
            }),
        }
    }
}

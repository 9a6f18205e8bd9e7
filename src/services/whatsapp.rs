use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::WhatsAppSettings;
use crate::models::OutboundReply;

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("WhatsApp credentials are not configured (WHATSAPP_TOKEN / PHONE_NUMBER_ID)")]
    NotConfigured,

    #[error("WhatsApp request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WhatsApp API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

/// Outbound text delivery. Implemented by the Cloud API client and by test doubles.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, reply: &OutboundReply) -> Result<SendReceipt, MessagingError>;
}

#[derive(Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

impl<'a> SendMessageRequest<'a> {
    fn text(reply: &'a OutboundReply) -> Self {
        SendMessageRequest {
            messaging_product: "whatsapp",
            to: &reply.to,
            kind: "text",
            text: TextBody { body: &reply.body },
        }
    }
}

#[derive(Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

pub struct WhatsAppClient {
    client: Client,
    access_token: Option<String>,
    messages_url: Option<String>,
}

impl WhatsAppClient {
    pub fn new(settings: &WhatsAppSettings) -> Self {
        let messages_url = settings.phone_number_id.as_ref().map(|id| {
            format!("{}/{}/{}/messages", settings.api_base, settings.api_version, id)
        });

        WhatsAppClient {
            client: Client::new(),
            access_token: settings.access_token.clone(),
            messages_url,
        }
    }
}

#[async_trait]
impl Messenger for WhatsAppClient {
    async fn send_text(&self, reply: &OutboundReply) -> Result<SendReceipt, MessagingError> {
        let (token, url) = match (&self.access_token, &self.messages_url) {
            (Some(token), Some(url)) => (token, url),
            _ => return Err(MessagingError::NotConfigured),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&SendMessageRequest::text(reply))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(MessagingError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        // A 2xx with an unexpected body still counts as delivered.
        let message_id = serde_json::from_str::<SendMessageResponse>(&text)
            .ok()
            .and_then(|r| r.messages.into_iter().next())
            .map(|m| m.id);

        Ok(SendReceipt { message_id })
    }
}

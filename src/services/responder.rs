use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{InboundMessage, OutboundReply};
use crate::services::interactions::InteractionLog;
use crate::services::reply::{compose_reply, with_resource_link};
use crate::services::sheets::Provisioner;
use crate::services::whatsapp::Messenger;

pub const APOLOGY_TEXT: &str =
    "Sorry, we couldn't process your message right now. Our team will get back to you shortly.";

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub job_id: Uuid,
    pub to: String,
    pub intent: Option<String>,
    pub resource_link: Option<String>,
    pub delivered: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Runs the reply pipeline for one inbound message:
/// record, provision, compose, send.
pub struct Responder {
    config: Arc<Config>,
    messenger: Arc<dyn Messenger>,
    provisioner: Option<Arc<dyn Provisioner>>,
    interactions: InteractionLog,
}

impl Responder {
    pub fn new(
        config: Arc<Config>,
        messenger: Arc<dyn Messenger>,
        provisioner: Option<Arc<dyn Provisioner>>,
        interactions: InteractionLog,
    ) -> Self {
        Self {
            config,
            messenger,
            provisioner,
            interactions,
        }
    }

    pub async fn respond(&self, job_id: Uuid, message: &InboundMessage) -> DispatchOutcome {
        let hour = self.config.clock.hour();
        let composed = compose_reply(&message.text, hour, &self.config.business_name);
        let intent = composed.intent.map(|i| i.as_str().to_string());

        self.interactions
            .record(&message.from, &message.describe(), intent.as_deref(), Utc::now());

        // Provisioning failures are logged and the reply goes out without a link.
        let mut resource_link = None;
        if let Some(provisioner) = &self.provisioner {
            match provisioner.provision(&message.from).await {
                Ok(resource) => {
                    tracing::info!(%job_id, spreadsheet_id = %resource.spreadsheet_id, "Resource ready");
                    resource_link = Some(resource.link);
                }
                Err(e) => {
                    tracing::error!(%job_id, sender = %message.from, error = %e, "Provisioning failed");
                }
            }
        }

        let body = match &resource_link {
            Some(link) => with_resource_link(&composed.body, link),
            None => composed.body,
        };

        let mut outcome = DispatchOutcome {
            job_id,
            to: message.from.clone(),
            intent,
            resource_link,
            delivered: false,
            message_id: None,
            error: None,
        };

        match self.messenger.send_text(&OutboundReply::new(&message.from, body)).await {
            Ok(receipt) => {
                tracing::info!(%job_id, to = %message.from, intent = ?outcome.intent, "Reply sent");
                outcome.delivered = true;
                outcome.message_id = receipt.message_id;
            }
            Err(e) => {
                tracing::error!(%job_id, to = %message.from, error = %e, "Reply delivery failed");
                outcome.error = Some(e.to_string());
                if self.config.apology_on_failure {
                    if let Err(e) = self
                        .messenger
                        .send_text(&OutboundReply::new(&message.from, APOLOGY_TEXT))
                        .await
                    {
                        tracing::warn!(%job_id, error = %e, "Apology delivery failed");
                    }
                }
            }
        }

        outcome
    }
}

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::config::DispatchMode;
use crate::models::WebhookPayload;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

// GET /webhook: subscription handshake. An undecodable query is forbidden too.
pub async fn verify(
    query: Option<web::Query<VerifyQuery>>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let query = match query {
        Some(q) => q.into_inner(),
        None => {
            tracing::warn!("Webhook verification query could not be decoded");
            return HttpResponse::Forbidden().finish();
        }
    };
    let token_matches = query.verify_token.as_deref() == Some(state.config.verify_token.as_str());

    if query.mode.as_deref() == Some("subscribe") && token_matches {
        tracing::info!("Webhook verified");
        HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(query.challenge.unwrap_or_default())
    } else {
        tracing::warn!(mode = ?query.mode, token_matches, "Webhook verification failed");
        HttpResponse::Forbidden().finish()
    }
}

// POST /webhook: delivery notifications
pub async fn receive(body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, bytes = body.len(), "Malformed webhook payload");
            return HttpResponse::InternalServerError().finish();
        }
    };

    for status in payload.statuses() {
        tracing::info!(
            message_id = ?status.id,
            status = ?status.status,
            recipient = ?status.recipient_id,
            timestamp = ?status.timestamp,
            "Delivery status update"
        );
    }

    let messages = payload.messages();
    if messages.is_empty() {
        return HttpResponse::Ok().finish();
    }

    let mut handles = Vec::with_capacity(messages.len());
    for message in messages {
        tracing::info!(
            message_id = ?message.id,
            from = %message.from,
            name = ?message.contact_name,
            kind = ?message.kind,
            text = %message.describe(),
            "Inbound message"
        );
        tracing::debug!(sent_at = ?message.timestamp, raw = %message.raw, "Inbound message payload");
        match state.dispatcher.submit(message) {
            Ok(handle) => {
                tracing::debug!(job_id = %handle.job_id, "Reply queued");
                handles.push(handle);
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not queue reply");
                return HttpResponse::InternalServerError().finish();
            }
        }
    }

    // Downstream failures never change the acknowledgement.
    if state.config.dispatch_mode == DispatchMode::Await {
        for handle in handles {
            match handle.completion().await {
                Ok(outcome) if !outcome.delivered => {
                    tracing::warn!(
                        job_id = %outcome.job_id,
                        to = %outcome.to,
                        error = ?outcome.error,
                        "Reply not delivered"
                    );
                }
                Ok(outcome) => {
                    tracing::debug!(
                        job_id = %outcome.job_id,
                        intent = ?outcome.intent,
                        message_id = ?outcome.message_id,
                        link = ?outcome.resource_link,
                        "Reply delivered"
                    );
                }
                Err(e) => tracing::warn!(error = %e, "Reply job did not complete"),
            }
        }
    }

    HttpResponse::Ok().finish()
}

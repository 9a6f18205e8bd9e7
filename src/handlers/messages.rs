use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::OutboundReply;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TestMessageRequest {
    pub to: Option<String>,
    pub message: Option<String>,
}

// Manual outbound send, bypassing the reply composer.
pub async fn send_test_message(
    data: web::Json<TestMessageRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let req = data.into_inner();
    let (to, message) = match (
        req.to.filter(|t| !t.trim().is_empty()),
        req.message.filter(|m| !m.trim().is_empty()),
    ) {
        (Some(to), Some(message)) => (to, message),
        _ => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Both 'to' and 'message' are required"
            }));
        }
    };

    match state.messenger.send_text(&OutboundReply::new(&to, message)).await {
        Ok(receipt) => {
            tracing::info!(to = %to, "Test message sent");
            HttpResponse::Ok().json(json!({
                "success": true,
                "to": to,
                "message_id": receipt.message_id
            }))
        }
        Err(e) => {
            tracing::error!(to = %to, error = %e, "Test message failed");
            HttpResponse::BadGateway().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

pub mod messages;
pub mod stats;
pub mod webhook;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(main))
        .route("/health", web::get().to(health_check))
        .route("/debug-config", web::get().to(debug_config))
        .route("/webhook", web::get().to(webhook::verify))
        .route("/webhook", web::post().to(webhook::receive))
        .route("/send-test-message", web::post().to(messages::send_test_message))
        .route("/stats", web::get().to(stats::get_stats))
        .route("/stats/export", web::get().to(stats::export_stats))
        .route("/stats/{sender}", web::get().to(stats::sender_history));
}

pub async fn main(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "service": "RealtyReach WhatsApp webhook",
        "version": env!("CARGO_PKG_VERSION"),
        "business": state.config.business_name,
        "endpoints": [
            "GET /webhook",
            "POST /webhook",
            "GET /health",
            "GET /stats",
            "GET /stats/export",
            "GET /stats/{sender}",
            "GET /debug-config",
            "POST /send-test-message"
        ]
    }))
}

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds()
    }))
}

fn presence(set: bool) -> &'static str {
    if set { "present" } else { "missing" }
}

// Reports which settings are present. Never echoes secret values.
pub async fn debug_config(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.config;
    HttpResponse::Ok().json(json!({
        "whatsapp_token": presence(config.whatsapp.access_token.is_some()),
        "phone_number_id": presence(config.whatsapp.phone_number_id.is_some()),
        "verify_token": presence(!config.verify_token.is_empty()),
        "graph_api_version": config.whatsapp.api_version,
        "provisioning": {
            "enabled": state.provisioning_enabled,
            "template": config.provisioning.as_ref().map(|p| presence(p.template_id.is_some())),
        },
        "dispatch_mode": config.dispatch_mode.as_str(),
        "apology_on_failure": config.apology_on_failure,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

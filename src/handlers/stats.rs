use std::io::Cursor;

use actix_web::{web, HttpResponse};
use rust_xlsxwriter::Workbook;
use serde_json::json;

use crate::services::interactions::InteractionLog;
use crate::state::AppState;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub async fn get_stats(state: web::Data<AppState>) -> HttpResponse {
    let stats = state.interactions.stats();
    HttpResponse::Ok().json(json!({
        "total_senders": stats.total_senders,
        "total_messages": stats.total_messages,
        "intents": stats.intents,
        "senders": stats.senders,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn sender_history(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let sender = path.into_inner();
    let history = state.interactions.history(&sender);
    if history.is_empty() {
        return HttpResponse::NotFound().json(json!({
            "error": "No messages from this sender"
        }));
    }
    HttpResponse::Ok().json(json!({
        "sender": sender,
        "message_count": history.len(),
        "messages": history
    }))
}

fn build_workbook(log: &InteractionLog) -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Interactions")?;

    for (c, h) in ["Sender", "Message", "Intent", "Received At"].iter().enumerate() {
        ws.write_string(0, c as u16, *h)?;
    }
    for (r, (sender, record)) in log.snapshot().iter().enumerate() {
        let row = (r as u32) + 1;
        ws.write_string(row, 0, sender)?;
        ws.write_string(row, 1, &record.text)?;
        ws.write_string(row, 2, record.intent.as_deref().unwrap_or("default"))?;
        ws.write_string(row, 3, record.received_at.to_rfc3339())?;
    }

    let mut buf: Vec<u8> = Vec::new();
    wb.save_to_writer(&mut Cursor::new(&mut buf))?;
    Ok(buf)
}

pub async fn export_stats(state: web::Data<AppState>) -> HttpResponse {
    match build_workbook(&state.interactions) {
        Ok(bytes) => {
            let filename = format!(
                "interactions-{}.xlsx",
                chrono::Utc::now().format("%Y%m%d-%H%M%S")
            );
            HttpResponse::Ok()
                .append_header(("Content-Type", XLSX_MIME))
                .append_header((
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", filename),
                ))
                .body(bytes)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build interaction export");
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to build export"
            }))
        }
    }
}

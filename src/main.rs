mod config;
mod handlers;
mod models;
mod services;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use config::Config;
use services::sheets::{GoogleSheetsProvisioner, Provisioner};
use services::whatsapp::{Messenger, WhatsAppClient};
use state::AppState;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    if !config.whatsapp.is_configured() {
        tracing::warn!(
            whatsapp_token = config.whatsapp.access_token.is_some(),
            phone_number_id = config.whatsapp.phone_number_id.is_some(),
            "WhatsApp credentials missing; replies will fail until they are set"
        );
    }

    let provisioner: Option<Arc<dyn Provisioner>> = match &config.provisioning {
        Some(settings) => match GoogleSheetsProvisioner::from_settings(settings) {
            Ok(p) => {
                tracing::info!(mode = p.mode(), "Spreadsheet provisioning enabled");
                let p: Arc<dyn Provisioner> = Arc::new(p);
                Some(p)
            }
            Err(e) => {
                tracing::error!(error = %e, "Spreadsheet provisioning credentials rejected");
                return Err(e.into());
            }
        },
        None => None,
    };

    let messenger: Arc<dyn Messenger> = Arc::new(WhatsAppClient::new(&config.whatsapp));
    let app_state = web::Data::new(AppState::new(config.clone(), messenger, provisioner));

    tracing::info!(
        port = config.port,
        business = %config.business_name,
        dispatch = config.dispatch_mode.as_str(),
        "Starting webhook server"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .wrap(Cors::permissive())
            .app_data(app_state.clone())
            .configure(handlers::routes)
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await?;

    Ok(())
}

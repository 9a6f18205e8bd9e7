use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::services::dispatch::ReplyDispatcher;
use crate::services::interactions::InteractionLog;
use crate::services::responder::Responder;
use crate::services::sheets::Provisioner;
use crate::services::whatsapp::Messenger;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub messenger: Arc<dyn Messenger>,
    pub interactions: InteractionLog,
    pub dispatcher: ReplyDispatcher,
    pub provisioning_enabled: bool,
    pub started_at: Instant,
}

impl AppState {
    /// Wires the reply pipeline and starts its worker. Needs a running Tokio runtime.
    pub fn new(
        config: Arc<Config>,
        messenger: Arc<dyn Messenger>,
        provisioner: Option<Arc<dyn Provisioner>>,
    ) -> Self {
        let interactions = InteractionLog::new();
        let provisioning_enabled = provisioner.is_some();
        let responder = Responder::new(
            config.clone(),
            messenger.clone(),
            provisioner,
            interactions.clone(),
        );

        Self {
            config,
            messenger,
            interactions,
            dispatcher: ReplyDispatcher::spawn(Arc::new(responder)),
            provisioning_enabled,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

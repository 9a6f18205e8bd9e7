use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::models::InboundMessage;
use crate::services::responder::{DispatchOutcome, Responder};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("reply worker is not running")]
    Closed,

    #[error("reply job {0} was dropped before completing")]
    Dropped(Uuid),
}

struct ReplyJob {
    id: Uuid,
    message: InboundMessage,
    done: oneshot::Sender<DispatchOutcome>,
}

/// Completion signal for a submitted job.
pub struct DispatchHandle {
    pub job_id: Uuid,
    rx: oneshot::Receiver<DispatchOutcome>,
}

impl DispatchHandle {
    pub async fn completion(self) -> Result<DispatchOutcome, DispatchError> {
        let job_id = self.job_id;
        self.rx.await.map_err(|_| DispatchError::Dropped(job_id))
    }
}

/// Work queue in front of the [`Responder`]. A single worker task drains it,
/// so replies go out one at a time in submission order.
#[derive(Clone)]
pub struct ReplyDispatcher {
    tx: mpsc::UnboundedSender<ReplyJob>,
}

impl ReplyDispatcher {
    /// Must be called from inside a Tokio runtime.
    pub fn spawn(responder: Arc<Responder>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ReplyJob>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let outcome = responder.respond(job.id, &job.message).await;
                tracing::debug!(job_id = %job.id, delivered = outcome.delivered, "Reply job finished");
                // The submitter may have stopped waiting (deferred mode).
                let _ = job.done.send(outcome);
            }
            tracing::info!("Reply worker stopped");
        });

        ReplyDispatcher { tx }
    }

    pub fn submit(&self, message: InboundMessage) -> Result<DispatchHandle, DispatchError> {
        let id = Uuid::new_v4();
        let (done, rx) = oneshot::channel();
        self.tx
            .send(ReplyJob { id, message, done })
            .map_err(|_| DispatchError::Closed)?;
        Ok(DispatchHandle { job_id: id, rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::interactions::InteractionLog;
    use crate::testing::{self, RecordingMessenger};

    fn dispatcher(messenger: Arc<RecordingMessenger>) -> ReplyDispatcher {
        let responder = Responder::new(
            Arc::new(testing::config()),
            messenger,
            None,
            InteractionLog::new(),
        );
        ReplyDispatcher::spawn(Arc::new(responder))
    }

    #[actix_web::test]
    async fn completion_reports_outcome() {
        let messenger = RecordingMessenger::new();
        let dispatcher = dispatcher(messenger.clone());

        let handle = dispatcher
            .submit(testing::text_message("9199900001", "hello"))
            .unwrap();
        let job_id = handle.job_id;
        let outcome = handle.completion().await.unwrap();

        assert_eq!(outcome.job_id, job_id);
        assert!(outcome.delivered);
        assert_eq!(messenger.sent().len(), 1);
    }

    #[actix_web::test]
    async fn jobs_run_in_submission_order() {
        let messenger = RecordingMessenger::new();
        let dispatcher = dispatcher(messenger.clone());

        let handles: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|s| dispatcher.submit(testing::text_message(s, "hi")).unwrap())
            .collect();
        for handle in handles {
            handle.completion().await.unwrap();
        }

        let order: Vec<String> = messenger.sent().into_iter().map(|r| r.to).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[actix_web::test]
    async fn dropped_handle_does_not_stop_the_job() {
        let messenger = RecordingMessenger::new();
        let dispatcher = dispatcher(messenger.clone());

        drop(dispatcher.submit(testing::text_message("a", "hi")).unwrap());
        let last = dispatcher.submit(testing::text_message("b", "hi")).unwrap();
        last.completion().await.unwrap();

        assert_eq!(messenger.sent().len(), 2);
    }
}

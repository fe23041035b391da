//! Session Controller
//!
//! Owns the active dataset and its insight snapshot. A dataset is installed
//! only by a successful upload and removed only by [`SessionController::reset`];
//! a failed upload leaves whatever was there before.

use crate::conversation::{ConversationEngine, EXAMPLE_QUESTIONS};
use crate::gateway::Gateway;
use crate::models::{DatasetSession, InsightSnapshot, LoadedDataset, UploadFile};
use crate::types::GatewayResult;
use tracing::{debug, info, warn};

/// Ticket for an upload in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTicket {
    epoch: u64,
    pub filename: String,
}

/// Result of an upload attempt, as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The new dataset is active and the conversation was reseeded.
    Installed(DatasetSession),
    /// The upload failed; the message is also kept as `last_error`.
    Failed(String),
    /// A reset happened while the upload was in flight.
    Discarded,
    /// Another upload is already running.
    Busy,
}

#[derive(Debug, Default)]
pub struct SessionController {
    active: Option<LoadedDataset>,
    uploading: bool,
    last_error: Option<String>,
    epoch: u64,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&DatasetSession> {
        self.active.as_ref().map(|loaded| &loaded.session)
    }

    pub fn insights(&self) -> Option<&InsightSnapshot> {
        self.active.as_ref().map(|loaded| &loaded.insights)
    }

    /// Id to scope queries with, if a dataset is active.
    pub fn dataset_id(&self) -> Option<&str> {
        self.session().map(|session| session.id.as_str())
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Mark an upload as started. Returns `None` if one is already running.
    pub fn begin_upload(&mut self, filename: &str) -> Option<UploadTicket> {
        if self.uploading {
            debug!("Upload of {} refused, another upload is running", filename);
            return None;
        }

        self.uploading = true;
        self.last_error = None;
        info!("Uploading {}", filename);

        Some(UploadTicket {
            epoch: self.epoch,
            filename: filename.to_string(),
        })
    }

    /// Apply the result of the upload identified by `ticket`.
    ///
    /// Clears the uploading flag whatever the outcome. On success the session
    /// and snapshot are swapped in together and the conversation restarts
    /// with a greeting for the new file.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        result: GatewayResult<LoadedDataset>,
        conversation: &mut ConversationEngine,
    ) -> UploadOutcome {
        self.uploading = false;

        if ticket.epoch != self.epoch {
            debug!("Discarding upload of {} finished after reset", ticket.filename);
            return UploadOutcome::Discarded;
        }

        match result {
            Ok(loaded) => {
                let session = loaded.session.clone();
                info!("Dataset {} ready ({})", session.id, session.filename);

                conversation.clear();
                conversation.seed_greeting(&session.filename, &EXAMPLE_QUESTIONS);
                self.active = Some(loaded);
                UploadOutcome::Installed(session)
            }
            Err(err) => {
                warn!("Upload of {} failed: {}", ticket.filename, err);
                let message = err.message().to_string();
                self.last_error = Some(message.clone());
                UploadOutcome::Failed(message)
            }
        }
    }

    /// Upload `file` and wait for the outcome in one step.
    pub async fn start(
        &mut self,
        gateway: &dyn Gateway,
        file: UploadFile,
        conversation: &mut ConversationEngine,
    ) -> UploadOutcome {
        let Some(ticket) = self.begin_upload(&file.filename) else {
            return UploadOutcome::Busy;
        };
        let result = gateway.upload(file).await;
        self.finish_upload(ticket, result, conversation)
    }

    /// Forget the active dataset and its conversation.
    ///
    /// Takes effect immediately: queries and uploads still in flight are
    /// ignored when they settle. Returns the dropped session so the caller
    /// can tear it down on the backend.
    pub fn reset(&mut self, conversation: &mut ConversationEngine) -> Option<DatasetSession> {
        let dropped = self.active.take().map(|loaded| loaded.session);
        self.last_error = None;
        self.epoch += 1;
        conversation.clear();

        if let Some(session) = &dropped {
            info!("Reset session {} ({})", session.id, session.filename);
        }
        dropped
    }
}

/// Fire-and-forget teardown of a dropped dataset. Failures are logged only.
pub fn spawn_teardown(gateway: std::sync::Arc<dyn Gateway>, session: DatasetSession) {
    tokio::spawn(async move {
        match gateway.teardown(&session.id).await {
            Ok(_) => debug!("Dataset {} torn down", session.id),
            Err(err) => warn!("Teardown of dataset {} failed: {}", session.id, err),
        }
    });
}

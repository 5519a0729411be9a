//! Request orchestration
//!
//! Turns user input into conversation mutations plus at most one backend
//! request, and folds the request's outcome back into the store. The
//! network call itself is performed by the runtime between `begin` and
//! `settle`, so the store is never borrowed across a suspension on I/O.

use crate::conversation::{ConversationStore, Message};
use crate::format::Formatter;
use crate::runtime::KeyValueStore;
use crate::transport::{SpeakRequest, SpeakResponse, TransportError};
use std::sync::Arc;

/// Input that wipes the conversation instead of being sent
pub const DEFAULT_RESET_COMMAND: &str = "/clear";

/// How a `send` ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reset command was entered; the conversation now holds only the welcome message
    Cleared,
    /// Input was empty after trimming; nothing changed
    Ignored,
    /// The backend replied and the reply was appended
    Delivered,
    /// The request failed; the user message is marked as errored
    Failed,
}

/// A request that has been recorded in the store and must now be issued
#[derive(Debug, Clone)]
pub struct PendingSpeak {
    /// Store epoch when the user message was appended
    pub epoch: u64,
    /// Index of the user message awaiting the reply
    pub index: usize,
    pub request: SpeakRequest,
}

/// Result of processing user input
#[derive(Debug)]
pub enum Dispatch {
    Done(SendOutcome),
    Pending(PendingSpeak),
}

pub struct Orchestrator<F: Formatter> {
    formatter: Arc<F>,
    reset_command: String,
}

impl<F: Formatter> Orchestrator<F> {
    pub fn new(formatter: Arc<F>, reset_command: impl Into<String>) -> Self {
        Self {
            formatter,
            reset_command: reset_command.into(),
        }
    }

    pub fn is_reset_command(&self, text: &str) -> bool {
        text.trim() == self.reset_command.trim()
    }

    /// Apply the synchronous part of a send.
    ///
    /// The pending request's history already contains the new user
    /// message, still marked as loading.
    pub async fn begin<S: KeyValueStore>(
        &self,
        store: &mut ConversationStore<S, F>,
        text: &str,
    ) -> Dispatch {
        if self.is_reset_command(text) {
            store.clear().await;
            return Dispatch::Done(SendOutcome::Cleared);
        }

        if text.trim().is_empty() {
            tracing::debug!("Ignoring empty input");
            return Dispatch::Done(SendOutcome::Ignored);
        }

        let body = self.formatter.format(text);
        let index = store.append(Message::user(body.clone())).await;
        store.request_started();

        tracing::debug!(index, epoch = store.epoch(), "Issuing speak request");

        Dispatch::Pending(PendingSpeak {
            epoch: store.epoch(),
            index,
            request: SpeakRequest {
                body,
                history: store.messages().to_vec(),
            },
        })
    }

    /// Fold a settled request back into the store.
    ///
    /// If the conversation was cleared while the request was in flight the
    /// message mutations are skipped; the request still counts as settled.
    pub async fn settle<S: KeyValueStore>(
        &self,
        store: &mut ConversationStore<S, F>,
        pending: &PendingSpeak,
        result: Result<SpeakResponse, TransportError>,
    ) -> SendOutcome {
        let current = pending.epoch == store.epoch();
        if !current {
            tracing::info!(
                epoch = pending.epoch,
                current_epoch = store.epoch(),
                "Conversation cleared while request was in flight, discarding outcome"
            );
        }

        let outcome = match result {
            Ok(response) => {
                if current {
                    let reply = self.formatter.format(&response.message);
                    store.resolve(pending.index, false);
                    store.append(Message::assistant(reply)).await;
                }
                SendOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!(
                    error = %e.message,
                    kind = ?e.kind,
                    "Message delivery failed"
                );
                if current {
                    store.resolve(pending.index, true);
                    store.commit().await;
                }
                SendOutcome::Failed
            }
        };

        store.request_settled();
        outcome
    }
}

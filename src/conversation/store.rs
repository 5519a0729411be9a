//! Conversation store
//!
//! Sole owner of the message list and the widget flags. Every mutation goes
//! through here, so what is persisted and what subscribers see cannot
//! diverge. Persistence failures are logged and never interrupt the
//! in-memory conversation.

use super::state::{ConversationFlags, ConversationSnapshot, Message};
use super::subscribers::{ChangeKind, Notification, Subscribers, Subscription};
use crate::config::WidgetConfig;
use crate::format::Formatter;
use crate::runtime::KeyValueStore;
use std::sync::Arc;

pub struct ConversationStore<S, F>
where
    S: KeyValueStore,
    F: Formatter,
{
    storage_key: String,
    welcome_message: String,
    storage: S,
    formatter: Arc<F>,
    messages: Vec<Message>,
    flags: ConversationFlags,
    subscribers: Subscribers,
    /// Bumped by `clear()`; lets late request settles detect that their
    /// message is gone
    epoch: u64,
    /// Requests begun but not yet settled; `sending` is true while nonzero
    in_flight: usize,
}

impl<S, F> ConversationStore<S, F>
where
    S: KeyValueStore,
    F: Formatter,
{
    pub fn new(config: &WidgetConfig, storage: S, formatter: Arc<F>) -> Self {
        Self {
            storage_key: config.storage_key.clone(),
            welcome_message: config.welcome_message.clone(),
            storage,
            formatter,
            messages: Vec::new(),
            flags: ConversationFlags::default(),
            subscribers: Subscribers::new(),
            epoch: 0,
            in_flight: 0,
        }
    }

    /// Adopt the persisted snapshot, or seed the welcome message.
    ///
    /// Publishes without writing back: what was just loaded or seeded is
    /// already canonical.
    pub async fn initialize(&mut self) {
        self.bootstrap().await;
        self.notify_messages(false).await;
    }

    async fn bootstrap(&mut self) {
        if let Some(stored) = self.load().await {
            let interrupted = stored.iter().filter(|m| m.loading).count();
            if interrupted > 0 {
                tracing::info!(
                    key = %self.storage_key,
                    interrupted,
                    "Clearing loading flag on interrupted messages"
                );
            }
            self.messages = stored
                .into_iter()
                .map(|mut message| {
                    message.loading = false;
                    message
                })
                .collect();
            tracing::debug!(
                key = %self.storage_key,
                count = self.messages.len(),
                "Adopted persisted conversation"
            );
        } else {
            self.messages = vec![self.welcome()];
        }
    }

    /// Persisted messages, if present, readable and non-empty
    async fn load(&self) -> Option<Vec<Message>> {
        let raw = match self.storage.get(&self.storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.storage_key, error = %e, "Failed to read conversation snapshot");
                return None;
            }
        };

        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) if !messages.is_empty() => Some(messages),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(key = %self.storage_key, error = %e, "Discarding unreadable conversation snapshot");
                None
            }
        }
    }

    fn welcome(&self) -> Message {
        Message::assistant(self.formatter.format(&self.welcome_message))
    }

    /// Add to the tail, persist and notify. Returns the new message's index.
    pub async fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.notify_messages(true).await;
        self.messages.len() - 1
    }

    /// Register an observer; it first receives the current state
    pub fn subscribe(&mut self) -> Subscription {
        let initial = self.notification(ChangeKind::Snapshot);
        self.subscribers.subscribe(initial)
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.flags.visible = visible;
        self.notify_flags();
    }

    pub fn set_sending(&mut self, sending: bool) {
        self.flags.sending = sending;
        self.notify_flags();
    }

    /// A request went out
    pub fn request_started(&mut self) {
        self.in_flight += 1;
        self.set_sending(true);
    }

    /// A request settled. `sending` drops only once none remain.
    pub fn request_settled(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.set_sending(self.in_flight > 0);
    }

    pub fn set_available(&mut self, available: bool) {
        self.flags.available = available;
        self.notify_flags();
    }

    /// Erase the conversation and reseed it with the welcome message
    pub async fn clear(&mut self) {
        if let Err(e) = self.storage.remove(&self.storage_key).await {
            tracing::warn!(key = %self.storage_key, error = %e, "Failed to remove conversation snapshot");
        }
        // Never read back: a failed remove leaves the old snapshot in place
        self.messages = vec![self.welcome()];
        self.epoch += 1;
        self.notify_messages(true).await;
        tracing::info!(key = %self.storage_key, "Conversation cleared");
    }

    /// Settle the request attached to the user message at `index`.
    ///
    /// Clears `loading` and records `is_error`. Does not notify; callers
    /// follow up with `append` or `commit`. Returns false if `index` is not
    /// a user message.
    pub fn resolve(&mut self, index: usize, failed: bool) -> bool {
        match self.messages.get_mut(index) {
            Some(message) if message.sent => {
                message.loading = false;
                message.is_error = failed;
                true
            }
            _ => {
                tracing::warn!(index, "No user message to resolve at index");
                false
            }
        }
    }

    /// Persist and publish the message list as it stands
    pub async fn commit(&self) {
        self.notify_messages(true).await;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn flags(&self) -> ConversationFlags {
        self.flags
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            flags: self.flags,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Release every subscription
    pub fn dispose(&mut self) {
        self.subscribers.clear();
    }

    fn notification(&self, kind: ChangeKind) -> Notification {
        Notification {
            kind,
            snapshot: self.snapshot(),
        }
    }

    async fn notify_messages(&self, persist: bool) {
        self.subscribers
            .notify(&self.notification(ChangeKind::Messages));

        if persist {
            self.persist().await;
        }
    }

    fn notify_flags(&self) {
        self.subscribers.notify(&self.notification(ChangeKind::Flags));
    }

    async fn persist(&self) {
        let encoded = match serde_json::to_string(&self.messages) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode conversation snapshot");
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.storage_key, &encoded).await {
            tracing::warn!(key = %self.storage_key, error = %e, "Failed to persist conversation snapshot");
        }
    }
}

//! Fan-out of conversation changes to observers
//!
//! Every subscriber owns an unbounded channel, so a slow observer never
//! loses a notification and all observers see the same ordered sequence.

use super::state::ConversationSnapshot;
use futures::Stream;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// What changed to produce a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Current state, delivered once when subscribing
    Snapshot,
    Messages,
    Flags,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: ChangeKind,
    pub snapshot: ConversationSnapshot,
}

type Registry = Mutex<BTreeMap<u64, mpsc::UnboundedSender<Notification>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, BTreeMap<u64, mpsc::UnboundedSender<Notification>>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observer list owned by the conversation store
#[derive(Default)]
pub struct Subscribers {
    registry: Arc<Registry>,
    next_id: u64,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. `initial` is queued before any later change.
    pub fn subscribe(&mut self, initial: Notification) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        // Receiver is alive here, send cannot fail
        let _ = tx.send(initial);

        let id = self.next_id;
        self.next_id += 1;
        lock(&self.registry).insert(id, tx);

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver to every live subscriber, dropping those whose receiver is gone
    pub fn notify(&self, notification: &Notification) {
        lock(&self.registry).retain(|_, tx| tx.send(notification.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every subscription; receivers end once drained
    pub fn clear(&self) {
        lock(&self.registry).clear();
    }
}

/// Receiving end of one observer registration
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<Notification>,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Next notification, or `None` once unsubscribed (or the widget is disposed)
    /// and everything queued has been drained
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).remove(&self.id);
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl Stream for Subscription {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}

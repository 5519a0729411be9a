//! Runtime for widget instances
//!
//! A `Widget` is a handle to one executor task that owns the conversation
//! store. Commands and request settles are processed one at a time, so the
//! conversation needs no locking.

mod executor;
pub mod traits;


pub use executor::WidgetRuntime;
pub use traits::*;

use crate::config::WidgetConfig;
use crate::conversation::{ConversationSnapshot, Subscription};
use crate::db::Database;
use crate::format::{Formatter, MarkdownFormatter};
use crate::orchestrator::SendOutcome;
use crate::transport::{HttpTransport, LoggingTransport, Transport, TransportError};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Type alias for the production runtime with concrete implementations
pub type ProductionWidgetRuntime =
    WidgetRuntime<DatabaseStore, LoggingTransport<HttpTransport>, MarkdownFormatter>;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WidgetError {
    #[error("Widget has been disposed")]
    Disposed,
}

/// Requests from a `Widget` handle to its executor
pub(crate) enum Command {
    Send {
        text: String,
        reply: oneshot::Sender<SendOutcome>,
    },
    SetVisible(bool),
    Clear {
        reply: oneshot::Sender<()>,
    },
    Subscribe {
        reply: oneshot::Sender<Subscription>,
    },
    Snapshot {
        reply: oneshot::Sender<ConversationSnapshot>,
    },
}

/// Handle to a running widget instance.
///
/// Share it behind an `Arc` to drive one widget from several tasks.
pub struct Widget {
    command_tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Widget {
    /// Start a widget over the given collaborators.
    ///
    /// The executor loads or seeds the conversation, launches the
    /// availability probe, then serves commands. Must be called from within
    /// a tokio runtime.
    pub fn spawn<S, T, F>(config: &WidgetConfig, storage: S, transport: T, formatter: F) -> Self
    where
        S: KeyValueStore + 'static,
        T: Transport + 'static,
        F: Formatter + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let runtime = WidgetRuntime::new(
            config,
            storage,
            Arc::new(transport),
            Arc::new(formatter),
            command_rx,
            cancel.clone(),
        );
        let handle = tokio::spawn(runtime.run());

        Self {
            command_tx,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Start a widget backed by SQLite, HTTP and markdown rendering
    pub fn connect(config: &WidgetConfig, db: Database) -> Result<Self, TransportError> {
        let transport = LoggingTransport::new(HttpTransport::new(&config.endpoint_url)?);
        Ok(Self::spawn(
            config,
            DatabaseStore::new(db),
            transport,
            MarkdownFormatter::new(),
        ))
    }

    /// Send user input. Resolves once the request has settled.
    ///
    /// Transport failures are reflected in the conversation and reported as
    /// `SendOutcome::Failed`, never as an error.
    pub async fn send(&self, text: impl Into<String>) -> Result<SendOutcome, WidgetError> {
        let text = text.into();
        self.request(|reply| Command::Send { text, reply }).await
    }

    pub async fn set_visible(&self, visible: bool) -> Result<(), WidgetError> {
        if self.cancel.is_cancelled() {
            return Err(WidgetError::Disposed);
        }
        self.command_tx
            .send(Command::SetVisible(visible))
            .await
            .map_err(|_| WidgetError::Disposed)
    }

    /// Wipe the conversation back to the welcome message
    pub async fn clear(&self) -> Result<(), WidgetError> {
        self.request(|reply| Command::Clear { reply }).await
    }

    /// Observe the conversation; the current state arrives first
    pub async fn subscribe(&self) -> Result<Subscription, WidgetError> {
        self.request(|reply| Command::Subscribe { reply }).await
    }

    pub async fn snapshot(&self) -> Result<ConversationSnapshot, WidgetError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled() || self.command_tx.is_closed()
    }

    /// Stop the executor, abandoning in-flight requests and releasing
    /// every subscription. Pending and later calls fail with
    /// `WidgetError::Disposed`. Safe to call more than once.
    pub async fn dispose(&self) {
        self.cancel.cancel();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Widget runtime task failed");
            }
        }
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, WidgetError> {
        if self.cancel.is_cancelled() {
            return Err(WidgetError::Disposed);
        }
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(command(reply))
            .await
            .map_err(|_| WidgetError::Disposed)?;
        rx.await.map_err(|_| WidgetError::Disposed)
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

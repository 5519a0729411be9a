//! Widget runtime executor

use super::traits::KeyValueStore;
use super::Command;
use crate::config::WidgetConfig;
use crate::conversation::ConversationStore;
use crate::format::Formatter;
use crate::orchestrator::{Dispatch, Orchestrator, PendingSpeak, SendOutcome};
use crate::prober::AvailabilityProber;
use crate::transport::{SpeakRequest, SpeakResponse, Transport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Outcome of a transport call, reported back from its task
enum Settled {
    Speak {
        pending: PendingSpeak,
        result: Result<SpeakResponse, TransportError>,
        reply: oneshot::Sender<SendOutcome>,
    },
    Probe {
        available: bool,
    },
}

/// Generic widget runtime that can work with any storage, transport, and formatter
pub struct WidgetRuntime<S, T, F>
where
    S: KeyValueStore + 'static,
    T: Transport + 'static,
    F: Formatter + 'static,
{
    store: ConversationStore<S, F>,
    orchestrator: Orchestrator<F>,
    transport: Arc<T>,
    probe_timeout: Duration,
    speak_timeout: Option<Duration>,
    command_rx: mpsc::Receiver<Command>,
    settled_tx: mpsc::UnboundedSender<Settled>,
    settled_rx: mpsc::UnboundedReceiver<Settled>,
    /// Cancelled on dispose; transport tasks hold child tokens
    cancel: CancellationToken,
}

impl<S, T, F> WidgetRuntime<S, T, F>
where
    S: KeyValueStore + 'static,
    T: Transport + 'static,
    F: Formatter + 'static,
{
    pub(crate) fn new(
        config: &WidgetConfig,
        storage: S,
        transport: Arc<T>,
        formatter: Arc<F>,
        command_rx: mpsc::Receiver<Command>,
        cancel: CancellationToken,
    ) -> Self {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        Self {
            store: ConversationStore::new(config, storage, Arc::clone(&formatter)),
            orchestrator: Orchestrator::new(formatter, config.reset_command.clone()),
            transport,
            probe_timeout: config.probe_timeout(),
            speak_timeout: config.speak_timeout(),
            command_rx,
            settled_tx,
            settled_rx,
            cancel,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Starting widget runtime");

        self.store.initialize().await;
        self.spawn_probe();

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                Some(settled) = self.settled_rx.recv() => {
                    self.handle_settled(settled).await;
                }

                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    // Every handle dropped
                    None => break,
                },
            }
        }

        // Abandon whatever is still in flight
        self.cancel.cancel();
        self.store.dispose();

        tracing::info!("Widget runtime stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { text, reply } => {
                match self.orchestrator.begin(&mut self.store, &text).await {
                    Dispatch::Done(outcome) => {
                        let _ = reply.send(outcome);
                    }
                    Dispatch::Pending(pending) => self.spawn_speak(pending, reply),
                }
            }
            Command::SetVisible(visible) => self.store.set_visible(visible),
            Command::Clear { reply } => {
                self.store.clear().await;
                let _ = reply.send(());
            }
            Command::Subscribe { reply } => {
                // A dropped reply drops the subscription, which unregisters it
                let _ = reply.send(self.store.subscribe());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.store.snapshot());
            }
        }
    }

    async fn handle_settled(&mut self, settled: Settled) {
        match settled {
            Settled::Speak {
                pending,
                result,
                reply,
            } => {
                let outcome = self
                    .orchestrator
                    .settle(&mut self.store, &pending, result)
                    .await;
                let _ = reply.send(outcome);
            }
            Settled::Probe { available } => {
                if available {
                    tracing::info!("Assistant backend is available");
                } else {
                    tracing::warn!("Assistant backend is unavailable");
                }
                self.store.set_available(available);
            }
        }
    }

    fn spawn_speak(&self, pending: PendingSpeak, reply: oneshot::Sender<SendOutcome>) {
        let transport = Arc::clone(&self.transport);
        let settled_tx = self.settled_tx.clone();
        let cancel = self.cancel.child_token();
        let deadline = self.speak_timeout;

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::debug!(index = pending.index, "Speak request abandoned");
                    return;
                }
                result = deliver(transport.as_ref(), &pending.request, deadline) => result,
            };

            let _ = settled_tx.send(Settled::Speak {
                pending,
                result,
                reply,
            });
        });
    }

    fn spawn_probe(&self) {
        let prober = AvailabilityProber::new(Arc::clone(&self.transport), self.probe_timeout);
        let settled_tx = self.settled_tx.clone();
        let cancel = self.cancel.child_token();

        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::debug!("Availability probe abandoned");
                }
                available = prober.probe() => {
                    let _ = settled_tx.send(Settled::Probe { available });
                }
            }
        });
    }
}

/// Issue the request, bounded by `deadline` when one is configured
async fn deliver<T: Transport>(
    transport: &T,
    request: &SpeakRequest,
    deadline: Option<Duration>,
) -> Result<SpeakResponse, TransportError> {
    let Some(limit) = deadline else {
        return transport.speak(request).await;
    };

    tokio::time::timeout(limit, transport.speak(request))
        .await
        .unwrap_or_else(|_| {
            Err(TransportError::timeout(format!(
                "No reply within {}ms",
                limit.as_millis()
            )))
        })
}

//! Bob widget core
//!
//! Conversation state for an embeddable assistant widget: durable message
//! history, the send/receive lifecycle against a remote assistant backend,
//! and availability/visibility state reported to the host surface.
//!
//! Hosts interact with a [`Widget`] handle. Rendering is left to whoever
//! consumes the [`Subscription`] stream.

pub mod config;
pub mod conversation;
pub mod db;
pub mod format;
pub mod orchestrator;
pub mod prober;
pub mod runtime;
pub mod transport;

pub use config::{ConfigError, WidgetConfig};
pub use conversation::{
    ChangeKind, ConversationFlags, ConversationSnapshot, ConversationStore, Message,
    MessageStatus, Notification, Subscription,
};
pub use db::Database;
pub use format::{Formatter, MarkdownFormatter};
pub use orchestrator::SendOutcome;
pub use prober::AvailabilityProber;
pub use runtime::{DatabaseStore, KeyValueStore, StorageError, Widget, WidgetError};
pub use transport::{
    HttpTransport, LoggingTransport, SpeakRequest, SpeakResponse, StatusResponse, Transport,
    TransportError, TransportErrorKind,
};

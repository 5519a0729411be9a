//! Conversation state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One exchanged utterance.
///
/// Serialized in the shape hosts and the backend already know:
/// `{ body, sent, date, loading, isError }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Rendered body, already passed through the formatter
    pub body: String,
    /// True when authored by the user, false for the assistant
    #[serde(default)]
    pub sent: bool,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    /// Set only while this message's request is in flight
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    /// A user message whose request is about to be issued
    pub fn user(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            sent: true,
            date: Utc::now(),
            loading: true,
            is_error: false,
        }
    }

    pub fn assistant(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            sent: false,
            date: Utc::now(),
            loading: false,
            is_error: false,
        }
    }

    pub fn status(&self) -> MessageStatus {
        if self.loading {
            MessageStatus::Sending
        } else if self.is_error {
            MessageStatus::Failed
        } else if self.sent {
            MessageStatus::Sent
        } else {
            MessageStatus::Received
        }
    }
}

/// Presentation status derived from a message's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Sending,
    Failed,
    Sent,
    Received,
}

impl MessageStatus {
    /// Hover text shown next to the message
    pub fn title(self) -> &'static str {
        match self {
            MessageStatus::Sending => "Message is sending",
            MessageStatus::Failed => "There was an error sending this message.",
            MessageStatus::Sent => "The message was sent successfully.",
            MessageStatus::Received => "The message was received successfully.",
        }
    }
}

/// Widget-level flags, observed independently of the message list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversationFlags {
    /// Widget panel open
    pub visible: bool,
    /// A send is in flight
    pub sending: bool,
    /// Backend answered the availability probe
    pub available: bool,
}

/// Full conversation state at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub flags: ConversationFlags,
}

//! Backend wire types

use crate::conversation::Message;
use serde::{Deserialize, Serialize};

/// Body of `POST {endpoint}/speak`.
///
/// The backend keeps no session state, so every call carries the full
/// conversation including the message being sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakRequest {
    pub body: String,
    pub history: Vec<Message>,
}

/// Reply to `/speak`; `message` is raw (unformatted) assistant text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakResponse {
    pub message: String,
}

impl SpeakResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Reply to `GET {endpoint}/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

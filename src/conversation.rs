//! Conversation state and its store
//!
//! The store owns the ordered message list and the widget flags, persists
//! snapshots, and fans changes out to subscribers.

pub mod state;
mod store;
mod subscribers;

#[cfg(test)]
mod proptests;

pub use state::{ConversationFlags, ConversationSnapshot, Message, MessageStatus};
pub use store::ConversationStore;
pub use subscribers::{ChangeKind, Notification, Subscribers, Subscription};

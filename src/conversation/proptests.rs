//! Property-based tests for the conversation store
//!
//! These tests verify key invariants hold across arbitrary persisted
//! snapshots and operation sequences.

use super::*;
use crate::config::WidgetConfig;
use crate::orchestrator::{Dispatch, Orchestrator, DEFAULT_RESET_COMMAND};
use crate::runtime::testing::{IdentityFormatter, InMemoryStore};
use crate::transport::{SpeakResponse, TransportError};
use chrono::DateTime;
use proptest::prelude::*;
use std::future::Future;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

type TestStore = ConversationStore<Arc<InMemoryStore>, IdentityFormatter>;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn test_config() -> WidgetConfig {
    WidgetConfig::new("http://localhost:3001", "bob", "Welcome")
}

async fn store_from(snapshot: Option<&str>) -> (TestStore, Arc<InMemoryStore>) {
    let storage = Arc::new(match snapshot {
        Some(raw) => InMemoryStore::with_entry("bob", raw),
        None => InMemoryStore::new(),
    });
    let mut store = ConversationStore::new(
        &test_config(),
        Arc::clone(&storage),
        Arc::new(IdentityFormatter),
    );
    store.initialize().await;
    (store, storage)
}

fn persisted(storage: &InMemoryStore) -> Vec<Message> {
    serde_json::from_str(&storage.entry("bob").unwrap()).unwrap()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_message() -> impl Strategy<Value = Message> {
    (
        "[a-zA-Z0-9 ]{0,30}",
        any::<bool>(),
        0i64..4_000_000_000,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(body, sent, secs, loading, is_error)| Message {
            body,
            sent,
            date: DateTime::from_timestamp(secs, 0).unwrap(),
            loading,
            is_error,
        })
}

#[derive(Debug, Clone)]
enum Op {
    Send { text: String, succeed: bool },
    Reset,
    Clear,
    Visible(bool),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => ("[a-z ]{0,12}", any::<bool>()).prop_map(|(text, succeed)| Op::Send { text, succeed }),
        1 => Just(Op::Reset),
        1 => Just(Op::Clear),
        1 => any::<bool>().prop_map(Op::Visible),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Recovery: nothing is left loading after bootstrap, order and content survive
    #[test]
    fn prop_bootstrap_clears_loading(messages in proptest::collection::vec(arb_message(), 1..10)) {
        let raw = serde_json::to_string(&messages).unwrap();
        let (store, _) = block_on(store_from(Some(raw.as_str())));

        prop_assert_eq!(store.messages().len(), messages.len());
        prop_assert!(store.messages().iter().all(|m| !m.loading));
        for (loaded, original) in store.messages().iter().zip(&messages) {
            prop_assert_eq!(&loaded.body, &original.body);
            prop_assert_eq!(loaded.sent, original.sent);
            prop_assert_eq!(loaded.is_error, original.is_error);
            prop_assert_eq!(loaded.date, original.date);
        }
    }

    // Bootstrapping twice from the same snapshot yields the same list
    #[test]
    fn prop_bootstrap_is_idempotent(messages in proptest::collection::vec(arb_message(), 1..10)) {
        let raw = serde_json::to_string(&messages).unwrap();
        let (first, _) = block_on(store_from(Some(raw.as_str())));
        let (second, _) = block_on(store_from(Some(raw.as_str())));
        prop_assert_eq!(first.messages(), second.messages());
    }

    // The reset command always leaves exactly the welcome message
    #[test]
    fn prop_reset_reseeds_welcome(
        messages in proptest::collection::vec(arb_message(), 0..10),
        padding in "[ \t]{0,3}",
    ) {
        let raw = serde_json::to_string(&messages).unwrap();
        block_on(async {
            let (mut store, storage) = store_from(Some(raw.as_str())).await;
            let orchestrator = Orchestrator::new(Arc::new(IdentityFormatter), DEFAULT_RESET_COMMAND);
            let input = format!("{padding}/clear{padding}");

            let dispatch = orchestrator.begin(&mut store, &input).await;
            prop_assert!(matches!(dispatch, Dispatch::Done(crate::orchestrator::SendOutcome::Cleared)));
            prop_assert_eq!(store.messages().len(), 1);
            prop_assert_eq!(&store.messages()[0].body, "Welcome");
            prop_assert!(!store.messages()[0].sent);
            prop_assert_eq!(persisted(&storage), store.messages().to_vec());
            Ok(())
        })?;
    }

    // Arbitrary interleavings keep the store consistent with what is persisted
    #[test]
    fn prop_operations_preserve_invariants(ops in proptest::collection::vec(arb_op(), 0..25)) {
        block_on(async {
            let (mut store, storage) = store_from(None).await;
            let orchestrator = Orchestrator::new(Arc::new(IdentityFormatter), DEFAULT_RESET_COMMAND);

            for op in ops {
                let before = store.messages().len();
                match op {
                    Op::Send { text, succeed } => {
                        match orchestrator.begin(&mut store, &text).await {
                            Dispatch::Done(_) => {
                                prop_assert!(text.trim().is_empty());
                                prop_assert_eq!(store.messages().len(), before);
                            }
                            Dispatch::Pending(pending) => {
                                prop_assert_eq!(pending.request.history.len(), before + 1);
                                prop_assert!(store.flags().sending);
                                let result = if succeed {
                                    Ok(SpeakResponse::new(format!("re: {text}")))
                                } else {
                                    Err(TransportError::network("down"))
                                };
                                orchestrator.settle(&mut store, &pending, result).await;
                                let expected = if succeed { before + 2 } else { before + 1 };
                                prop_assert_eq!(store.messages().len(), expected);
                                prop_assert_eq!(store.messages()[before].is_error, !succeed);
                            }
                        }
                    }
                    Op::Reset => {
                        orchestrator.begin(&mut store, DEFAULT_RESET_COMMAND).await;
                        prop_assert_eq!(store.messages().len(), 1);
                    }
                    Op::Clear => {
                        store.clear().await;
                        prop_assert_eq!(store.messages().len(), 1);
                    }
                    Op::Visible(visible) => {
                        store.set_visible(visible);
                        prop_assert_eq!(store.flags().visible, visible);
                    }
                }

                prop_assert!(!store.messages().is_empty());
                prop_assert!(!store.flags().sending);
                prop_assert!(store.messages().iter().all(|m| !m.loading));
                if let Some(entry) = storage.entry("bob") {
                    let on_disk: Vec<Message> = serde_json::from_str(&entry).unwrap();
                    prop_assert_eq!(on_disk, store.messages().to_vec());
                }
            }
            Ok(())
        })?;
    }
}

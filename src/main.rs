//! Bob - terminal host for the assistant widget
//!
//! Drives one widget instance from stdin and prints the conversation as it
//! changes. Lines starting with `:` are host commands (`:open`, `:close`,
//! `:quit`); everything else is sent to the assistant.

use bob_widget::{ChangeKind, Database, Message, Subscription, Widget, WidgetConfig};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the conversation
    let json = std::env::var("BOB_LOG_JSON").is_ok_and(|v| v != "0" && !v.is_empty());
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bob_widget=info,bob=info".into()),
        )
        .with(fmt_layer)
        .init();

    // Configuration
    let config = WidgetConfig::from_env()?;
    let db_path = std::env::var("BOB_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.bob/widget.db")
    });

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    tracing::info!(endpoint = %config.endpoint_url, key = %config.storage_key, "Starting widget");
    let widget = Widget::connect(&config, db)?;

    let subscription = widget.subscribe().await?;
    let printer = tokio::spawn(print_conversation(subscription));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" => break,
            ":open" => widget.set_visible(true).await?,
            ":close" => widget.set_visible(false).await?,
            _ => {
                let outcome = widget.send(line).await?;
                tracing::debug!(?outcome, "Send finished");
            }
        }
    }

    widget.dispose().await;
    printer.await?;

    Ok(())
}

/// Print messages as they appear and flag changes until the widget stops
async fn print_conversation(mut subscription: Subscription) {
    let mut printed: Vec<Message> = Vec::new();
    let mut available = None;

    while let Some(notification) = subscription.recv().await {
        let snapshot = notification.snapshot;

        let flags_changed = matches!(notification.kind, ChangeKind::Flags | ChangeKind::Snapshot);
        if flags_changed && available != Some(snapshot.flags.available) {
            available = Some(snapshot.flags.available);
            let state = if snapshot.flags.available {
                "online"
            } else {
                "offline"
            };
            println!("-- assistant {state}");
        }

        if snapshot.messages.len() < printed.len() {
            println!("-- conversation cleared");
            printed.clear();
        }

        for (index, message) in snapshot.messages.iter().enumerate() {
            if printed.get(index) != Some(message) {
                print_message(message);
            }
        }
        printed = snapshot.messages;
    }
}

fn print_message(message: &Message) {
    let who = if message.sent { "you" } else { "bob" };
    println!(
        "[{}] {who}: {} ({})",
        message.date.format("%H:%M"),
        message.body.trim_end(),
        message.status().title()
    );
}

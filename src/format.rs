//! Message body formatting
//!
//! User input and assistant replies go through the same formatter, so rich
//! text works in both directions.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

/// Converts raw text into the rendered body stored on a message
pub trait Formatter: Send + Sync {
    fn format(&self, text: &str) -> String;
}

/// Markdown to sanitized HTML
#[derive(Debug, Clone, Copy)]
pub struct MarkdownFormatter {
    options: Options,
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Formatter for MarkdownFormatter {
    fn format(&self, text: &str) -> String {
        // Raw HTML from either side never reaches the rendered body
        let parser = Parser::new_ext(text, self.options).filter_map(|event| match event {
            Event::Html(_) | Event::InlineHtml(_) => None,
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) if is_script_url(&dest_url) => Some(Event::Start(Tag::Link {
                link_type,
                dest_url: CowStr::Borrowed("#"),
                title,
                id,
            })),
            other => Some(other),
        });

        let mut out = String::new();
        html::push_html(&mut out, parser);
        out
    }
}

fn is_script_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    ["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

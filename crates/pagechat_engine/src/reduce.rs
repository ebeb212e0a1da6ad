use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use ego_tree::iter::Edge;
use regex::Regex;
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use session_logging::{session_debug, session_info, session_warn};

use crate::extract::ReadabilityExtractor;
use crate::truncate::truncate_content;

pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 1_600_000;

/// Elements whose text never reaches the reader.
pub(crate) const HIDDEN_ELEMENTS: &[&str] =
    &["head", "script", "style", "noscript", "template", "title"];

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Text pulled out of a page before it is bounded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedText {
    pub text: String,
    pub title: Option<String>,
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedText;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReductionStrategy {
    /// Every visible text node, in document order.
    Generic,
    /// Main-content subtree picked by text and link density.
    #[default]
    Readability,
}

/// Bounded prompt payload derived from a page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReducedText {
    pub text: String,
    pub title: Option<String>,
    pub original_chars: usize,
    pub truncated: bool,
}

impl ReducedText {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Turns raw HTML into a bounded payload. Never panics past `reduce`.
pub struct Reducer {
    extractor: Box<dyn TextExtractor>,
    max_content_length: usize,
}

impl Reducer {
    pub fn new(strategy: ReductionStrategy, max_content_length: usize) -> Self {
        let extractor: Box<dyn TextExtractor> = match strategy {
            ReductionStrategy::Generic => Box::new(TagStripExtractor),
            ReductionStrategy::Readability => Box::new(ReadabilityExtractor),
        };
        Self::with_extractor(extractor, max_content_length)
    }

    pub fn with_extractor(extractor: Box<dyn TextExtractor>, max_content_length: usize) -> Self {
        Self {
            extractor,
            max_content_length,
        }
    }

    pub fn reduce(&self, html: &str) -> ReducedText {
        let extracted =
            match panic::catch_unwind(AssertUnwindSafe(|| self.extractor.extract(html))) {
                Ok(extracted) => extracted,
                Err(_) => {
                    session_warn!("Text extraction panicked on {} bytes of html", html.len());
                    return ReducedText::default();
                }
            };

        if extracted.text.trim().is_empty() {
            session_warn!("Text extraction produced no content from {} bytes", html.len());
            return ReducedText {
                title: extracted.title,
                ..ReducedText::default()
            };
        }

        let bounded = truncate_content(&extracted.text, self.max_content_length);
        if bounded.truncated {
            session_info!(
                "Reduced text truncated from {} to {} chars",
                bounded.original_chars,
                self.max_content_length
            );
        }
        session_debug!(
            "Reduced {} bytes of html to {} chars",
            html.len(),
            bounded.original_chars
        );

        ReducedText {
            text: bounded.text,
            title: extracted.title,
            original_chars: bounded.original_chars,
            truncated: bounded.truncated,
        }
    }
}

/// Generic strategy: all visible text nodes joined as paragraphs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagStripExtractor;

impl TextExtractor for TagStripExtractor {
    fn extract(&self, html: &str) -> ExtractedText {
        let doc = Html::parse_document(html);
        let mut pieces: Vec<&str> = Vec::new();
        let mut hidden_depth = 0usize;

        for edge in doc.tree.root().traverse() {
            match edge {
                Edge::Open(node) => match node.value() {
                    Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()) => {
                        hidden_depth += 1;
                    }
                    Node::Text(text) if hidden_depth == 0 => {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            pieces.push(trimmed);
                        }
                    }
                    _ => {}
                },
                Edge::Close(node) => {
                    if let Node::Element(el) = node.value() {
                        if HIDDEN_ELEMENTS.contains(&el.name()) {
                            hidden_depth = hidden_depth.saturating_sub(1);
                        }
                    }
                }
            }
        }

        ExtractedText {
            text: normalize_text(&pieces.join("\n\n")),
            title: None,
        }
    }
}

/// Trim every line, collapse runs of blank lines to one, end with a newline.
pub(crate) fn normalize_text(raw: &str) -> String {
    let trimmed_lines = raw.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    let collapsed = BLANK_RUNS.replace_all(&trimmed_lines, "\n\n");
    let body = collapsed.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}

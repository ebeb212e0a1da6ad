use std::collections::HashMap;
use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::reduce::{normalize_text, ExtractedText, TextExtractor, HIDDEN_ELEMENTS};

const MIN_PARAGRAPH_CHARS: usize = 25;
const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " – ", " — ", " :: ", " » "];

static UNLIKELY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)banner|combx|comment|community|disqus|footer|header|menu|nav|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup",
    )
    .expect("static regex")
});
static MAYBE_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)and|article|body|column|main|shadow").expect("static regex"));
static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)hidden|banner|combx|comment|com-|contact|foot|footnote|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget",
    )
    .expect("static regex")
});
static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|main|page|post|text|blog|story")
        .expect("static regex")
});

/// Readability-style extractor:
/// - scores paragraph containers by text length, commas and class hints
/// - discounts candidates by their link density
/// - falls back to `<article>`, then `<body>`, then the whole document
/// - cleans the `<title>` of site-name suffixes
/// - renders the chosen subtree as light markdown via `html2md`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadabilityExtractor;

impl TextExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str) -> ExtractedText {
        let mut doc = Html::parse_document(html);
        let title = clean_title(&doc);
        strip_hidden(&mut doc);

        let content_html = match best_candidate(&doc) {
            Some(node) => node.inner_html(),
            None => fallback_content(&doc),
        };

        ExtractedText {
            text: normalize_text(&html2md::parse_html(&content_html)),
            title,
        }
    }
}

/// Detaches script, style and other non-rendered subtrees so neither scoring
/// nor the markdown rendering sees their text.
fn strip_hidden(doc: &mut Html) {
    let hidden: Vec<NodeId> = doc
        .tree
        .nodes()
        .filter(|node| {
            matches!(node.value(), Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()))
        })
        .map(|node| node.id())
        .collect();
    for id in hidden {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn best_candidate(doc: &Html) -> Option<ElementRef<'_>> {
    let paragraphs = Selector::parse("p, pre, td").ok()?;
    let links = Selector::parse("a").ok()?;

    let mut scores: HashMap<NodeId, f64> = HashMap::new();
    // Document order of first sighting; keeps tie-breaking deterministic.
    let mut order: Vec<NodeId> = Vec::new();

    for paragraph in doc.select(&paragraphs) {
        if is_unlikely(paragraph) {
            continue;
        }
        let text = paragraph.text().collect::<String>();
        let len = text.trim().chars().count();
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let commas = text.matches(',').count() + text.matches('，').count();
        let score = 1.0 + commas as f64 + (len / 100).min(3) as f64;

        let Some(parent) = paragraph.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        add_score(&mut scores, &mut order, parent, score);
        if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
            add_score(&mut scores, &mut order, grandparent, score / 2.0);
        }
    }

    let mut best: Option<(ElementRef<'_>, f64)> = None;
    for id in order {
        let Some(element) = doc.tree.get(id).and_then(ElementRef::wrap) else {
            continue;
        };
        let raw = scores.get(&id).copied().unwrap_or(0.0);
        let adjusted = raw * (1.0 - link_density(element, &links));
        if best.map_or(true, |(_, top)| adjusted > top) {
            best = Some((element, adjusted));
        }
    }
    best.filter(|(_, score)| *score > 0.0).map(|(element, _)| element)
}

fn add_score(
    scores: &mut HashMap<NodeId, f64>,
    order: &mut Vec<NodeId>,
    element: ElementRef<'_>,
    score: f64,
) {
    let entry = scores.entry(element.id()).or_insert_with(|| {
        order.push(element.id());
        base_score(element)
    });
    *entry += score;
}

fn base_score(element: ElementRef<'_>) -> f64 {
    let tag = match element.value().name() {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    tag + class_weight(element)
}

fn class_weight(element: ElementRef<'_>) -> f64 {
    let mut weight = 0.0;
    for hint in hints(element) {
        if NEGATIVE.is_match(&hint) {
            weight -= 25.0;
        }
        if POSITIVE.is_match(&hint) {
            weight += 25.0;
        }
    }
    weight
}

fn hints(element: ElementRef<'_>) -> Vec<String> {
    let value = element.value();
    [value.attr("class"), value.attr("id")]
        .into_iter()
        .flatten()
        .filter(|hint| !hint.trim().is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn is_unlikely(paragraph: ElementRef<'_>) -> bool {
    std::iter::once(paragraph)
        .chain(paragraph.ancestors().filter_map(ElementRef::wrap))
        .any(|element| {
            // Page-wide hints on the root say nothing about this paragraph.
            if matches!(element.value().name(), "html" | "body") {
                return false;
            }
            let hint = hints(element).join(" ");
            !hint.is_empty() && UNLIKELY.is_match(&hint) && !MAYBE_CANDIDATE.is_match(&hint)
        })
}

fn link_density(element: ElementRef<'_>, links: &Selector) -> f64 {
    let total = element.text().map(|t| t.chars().count()).sum::<usize>();
    if total == 0 {
        return 0.0;
    }
    let linked = element
        .select(links)
        .flat_map(|a| a.text())
        .map(|t| t.chars().count())
        .sum::<usize>();
    linked as f64 / total as f64
}

fn fallback_content(doc: &Html) -> String {
    for selector in ["article", "body"] {
        if let Ok(sel) = Selector::parse(selector) {
            if let Some(node) = doc.select(&sel).next() {
                return node.inner_html();
            }
        }
    }
    doc.root_element().html()
}

fn clean_title(doc: &Html) -> Option<String> {
    let raw = first_text(doc, "title").or_else(|| first_text(doc, "h1"))?;

    let split_at = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| raw.rfind(sep))
        .max();
    let cleaned = match split_at {
        Some(idx) => {
            let head = raw[..idx].trim();
            if is_substantial(head) {
                head.to_string()
            } else {
                raw.clone()
            }
        }
        None => raw,
    };
    Some(cleaned)
}

fn is_substantial(title: &str) -> bool {
    title.split_whitespace().count() >= 3
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .next()
        .map(|node| {
            node.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_drops_site_suffix() {
        let doc = Html::parse_document(
            "<html><head><title>Rust ownership explained simply | Example Blog</title></head></html>",
        );
        assert_eq!(
            clean_title(&doc).as_deref(),
            Some("Rust ownership explained simply")
        );
    }

    #[test]
    fn short_title_head_keeps_full_title() {
        let doc = Html::parse_document("<title>Home - Site</title>");
        assert_eq!(clean_title(&doc).as_deref(), Some("Home - Site"));
    }

    #[test]
    fn long_single_word_head_keeps_full_title() {
        let doc = Html::parse_document("<title>Documentation - Example</title>");
        assert_eq!(
            clean_title(&doc).as_deref(),
            Some("Documentation - Example")
        );
    }

    #[test]
    fn title_falls_back_to_heading() {
        let doc = Html::parse_document("<body><h1>  Only   heading </h1></body>");
        assert_eq!(clean_title(&doc).as_deref(), Some("Only heading"));
    }

    #[test]
    fn link_heavy_block_loses_to_prose() {
        let html = r#"
        <body>
          <div id="links">
            <p><a href="/a">A very long link text that goes on and on, and on</a></p>
            <p><a href="/b">Another very long link text that goes on, and on</a></p>
          </div>
          <div id="story">
            <p>Plain prose paragraph with enough characters, commas, and words.</p>
            <p>Second prose paragraph, also long enough to count as content.</p>
          </div>
        </body>"#;
        let doc = Html::parse_document(html);
        let best = best_candidate(&doc).expect("candidate");
        assert_eq!(best.value().attr("id"), Some("story"));
    }

    #[test]
    fn body_class_hint_does_not_disqualify_paragraphs() {
        let html = r#"
        <body class="has-sidebar">
          <div id="story">
            <p>Plain prose paragraph with enough characters, commas, and words.</p>
          </div>
        </body>"#;
        let doc = Html::parse_document(html);
        let paragraph = doc
            .select(&Selector::parse("p").expect("selector"))
            .next()
            .expect("paragraph");
        assert!(!is_unlikely(paragraph));
        let best = best_candidate(&doc).expect("candidate");
        assert_eq!(best.value().attr("id"), Some("story"));
    }

    #[test]
    fn hidden_elements_are_detached() {
        let mut doc = Html::parse_document(
            "<body><p>kept</p><script>var x = 1;</script><style>p{}</style><noscript>nojs</noscript></body>",
        );
        strip_hidden(&mut doc);
        let text = doc.root_element().text().collect::<String>();
        assert_eq!(text, "kept");
    }
}

pub const TRUNCATION_MARKER: &str = "\n\n... (content truncated)";

/// Result of bounding a payload to a character budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub text: String,
    pub original_chars: usize,
    pub truncated: bool,
}

/// Keep at most `max_chars` characters; when cut, append [`TRUNCATION_MARKER`].
pub fn truncate_content(text: &str, max_chars: usize) -> Truncated {
    let original_chars = text.chars().count();
    if original_chars <= max_chars {
        return Truncated {
            text: text.to_string(),
            original_chars,
            truncated: false,
        };
    }
    let end = text
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    Truncated {
        text: format!("{}{TRUNCATION_MARKER}", &text[..end]),
        original_chars,
        truncated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::{truncate_content, TRUNCATION_MARKER};

    #[test]
    fn short_content_kept_as_is() {
        let out = truncate_content("short payload", 64);
        assert_eq!(out.text, "short payload");
        assert!(!out.truncated);
        assert_eq!(out.original_chars, 13);
    }

    #[test]
    fn content_at_limit_is_not_marked() {
        let content = "a".repeat(32);
        let out = truncate_content(&content, 32);
        assert_eq!(out.text, content);
        assert!(!out.truncated);
    }

    #[test]
    fn truncated_content_appends_marker() {
        let content = "a".repeat(128 + 7);
        let out = truncate_content(&content, 128);
        assert!(out.text.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            out.text.chars().count(),
            128 + TRUNCATION_MARKER.chars().count()
        );
        assert_eq!(out.original_chars, 135);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let content = "測試".repeat(10);
        let out = truncate_content(&content, 5);
        assert_eq!(out.text, format!("測試測試測{TRUNCATION_MARKER}"));
    }
}

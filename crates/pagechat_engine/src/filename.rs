const MAX_STEM_CHARS: usize = 50;

/// Archive filename for a page title: `{stem}.md`.
///
/// The stem keeps the first 50 characters of the title, turns spaces into
/// `-`, and drops anything other than alphanumerics, `-`, `_` and `.`.
pub fn summary_filename(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .take(MAX_STEM_CHARS)
        .map(|c| if c == ' ' { '-' } else { c })
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let mut stem = stem.trim_matches(&['-', '.'][..]).to_string();
    if stem.is_empty() {
        stem = "untitled".to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    format!("{stem}.md")
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

use std::io::Write;

use crossterm::style::{ContentStyle, Stylize};
use pagechat_core::{FailurePhase, PageMeta, RunOutcome, TurnKind};
use pagechat_engine::Renderer;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

const RULE_WIDTH: usize = 48;
const FULLWIDTH_COLON: char = '：';

/// A run of text sharing one terminal style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Span {
    pub text: String,
    pub style: ContentStyle,
}

/// Styled terminal renderer.
///
/// Deltas are echoed dimmed while the model streams; once a turn ends the
/// final text is printed again below a rule, styled: summaries line by line,
/// answers as markdown.
pub(crate) struct RichRenderer<W: Write + Send> {
    out: W,
    summary_label: String,
    at_line_start: bool,
}

impl<W: Write + Send> RichRenderer<W> {
    pub fn new(out: W, summary_label: impl Into<String>) -> Self {
        Self {
            out,
            summary_label: summary_label.into(),
            at_line_start: true,
        }
    }

    fn write_spans(&mut self, spans: &[Span]) {
        for span in spans {
            let _ = write!(self.out, "{}", span.style.apply(span.text.as_str()));
            if !span.text.is_empty() {
                self.at_line_start = span.text.ends_with('\n');
            }
        }
        let _ = self.out.flush();
    }

    fn write_styled(&mut self, text: &str, style: ContentStyle) {
        self.write_spans(&[Span {
            text: text.to_string(),
            style,
        }]);
    }

    fn end_line(&mut self) {
        if !self.at_line_start {
            self.write_styled("\n", ContentStyle::new());
        }
    }
}

impl<W: Write + Send> Renderer for RichRenderer<W> {
    fn on_page(&mut self, page: &PageMeta) {
        self.write_styled("✅ ", ContentStyle::new().green());
        self.write_styled(&page.title, ContentStyle::new().bold());
        self.write_styled("\n🔗 ", ContentStyle::new());
        self.write_styled(&page.url, ContentStyle::new().blue().underlined());
        self.write_styled("\n", ContentStyle::new());
    }

    fn on_turn_start(&mut self, kind: TurnKind) {
        self.end_line();
        let header = match kind {
            TurnKind::Summary => "\n── Summary ──\n",
            TurnKind::Answer => "\n── Answer ──\n",
        };
        self.write_styled(header, ContentStyle::new().magenta().bold());
    }

    fn on_delta(&mut self, text: &str) {
        self.write_styled(text, ContentStyle::new().dark_grey());
    }

    fn on_final(&mut self, kind: TurnKind, text: &str) {
        self.end_line();
        self.write_styled(
            &format!("{}\n", "─".repeat(RULE_WIDTH)),
            ContentStyle::new().dark_grey(),
        );
        let spans = match kind {
            TurnKind::Summary => summary_spans(text, &self.summary_label),
            TurnKind::Answer => markdown_spans(text),
        };
        self.write_spans(&spans);
    }

    fn on_failure(&mut self, phase: FailurePhase, cause: &str) {
        self.end_line();
        self.write_styled(
            &format!("❌ {phase} failed: {cause}\n"),
            ContentStyle::new().red().bold(),
        );
    }

    fn on_notice(&mut self, message: &str) {
        self.end_line();
        self.write_styled(&format!("✓ {message}\n"), ContentStyle::new().green());
    }

    fn prompt_question(&mut self) {
        self.end_line();
        self.write_styled(
            "\nYour question (type 'exit' to quit) > ",
            ContentStyle::new().yellow().bold(),
        );
        self.at_line_start = true;
    }

    fn on_finish(&mut self, outcome: RunOutcome) {
        self.end_line();
        match outcome {
            RunOutcome::Completed => self.write_styled("Bye.\n", ContentStyle::new()),
            RunOutcome::Failed(phase) => self.write_styled(
                &format!("Stopped: {phase} failed.\n"),
                ContentStyle::new().red(),
            ),
        }
    }
}

/// Summary lines: the labelled one-liner in cyan, other labelled lines in
/// yellow, everything else plain.
pub(crate) fn summary_spans(text: &str, summary_label: &str) -> Vec<Span> {
    let lead = format!("{summary_label}{FULLWIDTH_COLON}");
    let mut spans = Vec::new();
    for line in text.trim_end().lines() {
        let style = if line.starts_with(&lead) {
            ContentStyle::new().cyan().bold()
        } else if line.contains(FULLWIDTH_COLON) {
            ContentStyle::new().yellow().bold()
        } else {
            ContentStyle::new()
        };
        spans.push(Span {
            text: line.to_string(),
            style,
        });
        spans.push(Span {
            text: "\n".to_string(),
            style: ContentStyle::new(),
        });
    }
    spans
}

/// Light markdown rendering: headings, emphasis, inline and fenced code,
/// lists, links and rules. Soft breaks keep their line structure.
pub(crate) fn markdown_spans(text: &str) -> Vec<Span> {
    let mut writer = MarkdownWriter::default();
    for event in Parser::new(text) {
        writer.event(event);
    }
    writer.finish()
}

#[derive(Default)]
struct MarkdownWriter {
    spans: Vec<Span>,
    styles: Vec<ContentStyle>,
    lists: Vec<Option<u64>>,
    in_code_block: bool,
}

impl MarkdownWriter {
    fn style(&self) -> ContentStyle {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push(&mut self, text: &str, style: ContentStyle) {
        if text.is_empty() {
            return;
        }
        self.spans.push(Span {
            text: text.to_string(),
            style,
        });
    }

    fn trailing_newlines(&self) -> usize {
        let mut count = 0;
        for span in self.spans.iter().rev() {
            let newlines = span.text.chars().rev().take_while(|c| *c == '\n').count();
            count += newlines;
            if newlines < span.text.chars().count() {
                break;
            }
        }
        count
    }

    /// Start a new line unless already at one.
    fn newline(&mut self) {
        if !self.spans.is_empty() && self.trailing_newlines() == 0 {
            self.push("\n", ContentStyle::new());
        }
    }

    /// End the current block with exactly one empty line.
    fn blank_line(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        for _ in self.trailing_newlines()..2 {
            self.push("\n", ContentStyle::new());
        }
    }

    fn open(&mut self, style: ContentStyle) {
        self.styles.push(style);
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.in_code_block => {
                for line in text.lines() {
                    self.push(&format!("    {line}"), self.style());
                    self.push("\n", ContentStyle::new());
                }
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.push(&text, self.style());
            }
            Event::Code(code) => self.push(&code, self.style().yellow()),
            Event::SoftBreak | Event::HardBreak => self.push("\n", ContentStyle::new()),
            Event::Rule => {
                self.newline();
                self.push(&"─".repeat(RULE_WIDTH), ContentStyle::new().dark_grey());
                self.blank_line();
            }
            Event::TaskListMarker(done) => {
                self.push(if done { "[x] " } else { "[ ] " }, self.style());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.newline();
                let style = if level == HeadingLevel::H1 {
                    self.style().bold().underlined()
                } else {
                    self.style().bold()
                };
                self.open(style);
            }
            Tag::Strong => self.open(self.style().bold()),
            Tag::Emphasis => self.open(self.style().italic()),
            Tag::Strikethrough => self.open(self.style().crossed_out()),
            Tag::Link { .. } => self.open(self.style().blue().underlined()),
            Tag::CodeBlock(kind) => {
                self.newline();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.push(&format!("    [{lang}]\n"), ContentStyle::new().dark_grey());
                    }
                }
                self.in_code_block = true;
                self.open(self.style().yellow());
            }
            Tag::List(start) => {
                self.newline();
                self.lists.push(start);
            }
            Tag::Item => {
                self.newline();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.push(&format!("{}{marker}", "  ".repeat(depth)), self.style());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.blank_line();
            }
            TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough | TagEnd::Link => {
                self.styles.pop();
            }
            TagEnd::CodeBlock => {
                self.styles.pop();
                self.in_code_block = false;
                self.blank_line();
            }
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.blank_line();
                } else {
                    self.newline();
                }
            }
            TagEnd::Item => self.newline(),
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            _ => {}
        }
    }

    /// Drop trailing blank lines and end with exactly one newline.
    fn finish(mut self) -> Vec<Span> {
        while let Some(last) = self.spans.last_mut() {
            let trimmed = last.text.trim_end_matches('\n').len();
            if trimmed == 0 {
                self.spans.pop();
            } else {
                last.text.truncate(trimmed);
                break;
            }
        }
        if !self.spans.is_empty() {
            self.spans.push(Span {
                text: "\n".to_string(),
                style: ContentStyle::new(),
            });
        }
        self.spans
    }
}

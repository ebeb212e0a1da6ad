use std::io::{BufRead, Write};

use pagechat_core::{FailurePhase, PageMeta, RunOutcome, TurnKind};

use crate::stream::DeltaSink;

/// Presentation surface for a conversation.
///
/// `on_delta` echoes fragments live; `on_final` receives the joined,
/// reasoning-free text once the stream ends. Whether the final rendering
/// replaces or follows the live echo is up to the implementation.
pub trait Renderer: Send {
    fn on_page(&mut self, _page: &PageMeta) {}
    fn on_turn_start(&mut self, _kind: TurnKind) {}
    fn on_delta(&mut self, text: &str);
    fn on_final(&mut self, kind: TurnKind, text: &str);
    fn on_failure(&mut self, phase: FailurePhase, cause: &str);
    fn on_notice(&mut self, _message: &str) {}
    fn prompt_question(&mut self) {}
    fn on_finish(&mut self, _outcome: RunOutcome) {}
}

/// Forwards streamed deltas to a renderer.
pub(crate) struct RendererSink<'a>(pub(crate) &'a mut dyn Renderer);

impl DeltaSink for RendererSink<'_> {
    fn on_delta(&mut self, delta: &str) {
        self.0.on_delta(delta);
    }
}

/// Plain-text renderer: echoes deltas as they arrive and only closes the
/// line once the turn ends.
pub struct PlainRenderer<W: Write + Send> {
    out: W,
    at_line_start: bool,
}

impl<W: Write + Send> PlainRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            at_line_start: true,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
        self.at_line_start = text.ends_with('\n');
    }

    fn end_line(&mut self) {
        if !self.at_line_start {
            self.write("\n");
        }
    }
}

impl<W: Write + Send> Renderer for PlainRenderer<W> {
    fn on_page(&mut self, page: &PageMeta) {
        self.write(&format!("Title: {}\nURL: {}\n", page.title, page.url));
    }

    fn on_turn_start(&mut self, kind: TurnKind) {
        self.end_line();
        match kind {
            TurnKind::Summary => self.write("\nSummary:\n"),
            TurnKind::Answer => self.write("\nAnswer:\n"),
        }
    }

    fn on_delta(&mut self, text: &str) {
        self.write(text);
    }

    fn on_final(&mut self, _kind: TurnKind, _text: &str) {
        self.end_line();
    }

    fn on_failure(&mut self, phase: FailurePhase, cause: &str) {
        self.end_line();
        self.write(&format!("Error: {phase} failed: {cause}\n"));
    }

    fn on_notice(&mut self, message: &str) {
        self.end_line();
        self.write(&format!("{message}\n"));
    }

    fn prompt_question(&mut self) {
        self.end_line();
        self.write("\nYour question (type 'exit' to quit) > ");
        self.at_line_start = true;
    }

    fn on_finish(&mut self, outcome: RunOutcome) {
        self.end_line();
        match outcome {
            RunOutcome::Completed => self.write("Bye.\n"),
            RunOutcome::Failed(phase) => self.write(&format!("Stopped: {phase} failed.\n")),
        }
    }
}

/// Source of user questions; `None` means input is exhausted.
pub trait QuestionSource {
    fn next_line(&mut self) -> Option<String>;
}

/// Reads one question per line from any buffered reader (stdin in the app).
pub struct LineQuestions<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineQuestions<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> QuestionSource for LineQuestions<R> {
    fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

use crate::{FailurePhase, PageMeta, RunOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Reduce the page markup to a prompt payload.
    Reduce { html: String },
    /// Run one streamed model turn.
    RequestTurn(TurnRequest),
    /// Hand a completed response to the final renderer.
    Display { kind: TurnKind, text: String },
    /// Archive the first successful summary.
    SaveSummary { page: PageMeta, title: String, text: String },
    /// Ask the user for the next question.
    PromptQuestion,
    ReportFailure { phase: FailurePhase, cause: String },
    Finish(RunOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnRequest {
    Summary {
        url: String,
        title: String,
        body: String,
    },
    Answer {
        context: String,
        question: String,
    },
}

impl TurnRequest {
    pub fn kind(&self) -> TurnKind {
        match self {
            TurnRequest::Summary { .. } => TurnKind::Summary,
            TurnRequest::Answer { .. } => TurnKind::Answer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Summary,
    Answer,
}

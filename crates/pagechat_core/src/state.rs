use std::fmt;

use serde::{Deserialize, Serialize};

use crate::view_model::ConversationView;

/// Page handed over by the page source. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageMeta {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Init,
    Summarizing,
    AwaitingQuestion,
    Answering,
    Done,
}

/// Which earlier response a follow-up question is answered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContextPolicy {
    /// Context rolls forward to the latest successful response.
    #[default]
    MostRecent,
    /// Every follow-up is answered against the first summary.
    OriginalSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    PageFetch,
    Extraction,
    Summary,
    Answer,
}

impl FailurePhase {
    /// Whether a failure in this phase ends the whole run.
    pub fn is_terminal(self) -> bool {
        !matches!(self, FailurePhase::Answer)
    }
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePhase::PageFetch => write!(f, "page fetch"),
            FailurePhase::Extraction => write!(f, "text extraction"),
            FailurePhase::Summary => write!(f, "summary"),
            FailurePhase::Answer => write!(f, "answer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(FailurePhase),
}

impl RunOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// Conversation state owned by the loop driver. Only `update` mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationState {
    phase: Phase,
    policy: ContextPolicy,
    page: Option<PageMeta>,
    title: String,
    summary: Option<String>,
    last_response: Option<String>,
    turns_completed: u32,
    outcome: Option<RunOutcome>,
}

impl ConversationState {
    pub fn new(policy: ContextPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn policy(&self) -> ContextPolicy {
        self.policy
    }

    pub fn page(&self) -> Option<&PageMeta> {
        self.page.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    /// Context the next chat turn is answered against, per the policy.
    pub fn context_for_next_turn(&self) -> Option<&str> {
        match self.policy {
            ContextPolicy::MostRecent => self.last_response(),
            ContextPolicy::OriginalSummary => self.summary(),
        }
    }

    pub fn view(&self) -> ConversationView {
        ConversationView {
            phase: self.phase,
            title: self.title.clone(),
            url: self.page.as_ref().map(|page| page.url.clone()),
            turns_completed: self.turns_completed,
            context_chars: self
                .context_for_next_turn()
                .map(|text| text.chars().count())
                .unwrap_or(0),
            outcome: self.outcome,
        }
    }

    pub(crate) fn load_page(&mut self, page: PageMeta) {
        self.title = page.title.clone();
        self.page = Some(page);
        self.phase = Phase::Summarizing;
    }

    pub(crate) fn adopt_title(&mut self, title: Option<String>) {
        if let Some(title) = title.map(|t| t.trim().to_string()) {
            if !title.is_empty() {
                self.title = title;
            }
        }
    }

    pub(crate) fn record_summary(&mut self, text: String) {
        self.summary = Some(text.clone());
        self.last_response = Some(text);
        self.turns_completed += 1;
        self.phase = Phase::AwaitingQuestion;
    }

    pub(crate) fn record_answer(&mut self, text: String) {
        self.last_response = Some(text);
        self.turns_completed += 1;
        self.phase = Phase::AwaitingQuestion;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn finish(&mut self, outcome: RunOutcome) {
        self.phase = Phase::Done;
        self.outcome = Some(outcome);
    }
}

use crate::{Phase, RunOutcome};

/// Read-only snapshot of the conversation for presentation and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationView {
    pub phase: Phase,
    pub title: String,
    pub url: Option<String>,
    pub turns_completed: u32,
    pub context_chars: usize,
    pub outcome: Option<RunOutcome>,
}

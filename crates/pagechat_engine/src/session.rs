use std::collections::VecDeque;

use pagechat_core::{
    update, ConversationState, Effect, Msg, PageMeta, RunOutcome, TurnRequest,
};
use session_logging::{session_debug, session_error, session_info, session_warn, set_turn};

use crate::archive::{SummaryArchive, SummaryRecord};
use crate::config::ChatConfig;
use crate::page_source::PageSource;
use crate::prompt::{PromptBuilder, PromptMode};
use crate::reduce::Reducer;
use crate::render::{QuestionSource, Renderer, RendererSink};
use crate::stream::{ChatClient, ChatRequest};

/// Drives the conversation state machine, executing its effects in order.
pub struct ConversationLoop {
    config: ChatConfig,
    client: Box<dyn ChatClient>,
    reducer: Reducer,
    prompts: PromptBuilder,
    archives: Vec<Box<dyn SummaryArchive>>,
}

impl ConversationLoop {
    pub fn new(config: ChatConfig, client: Box<dyn ChatClient>) -> Self {
        let reducer = Reducer::new(config.reduction, config.limits.max_content_length);
        let prompts = PromptBuilder::new(config.prompt.clone());
        Self {
            config,
            client,
            reducer,
            prompts,
            archives: Vec::new(),
        }
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_archive(mut self, archive: Box<dyn SummaryArchive>) -> Self {
        self.archives.push(archive);
        self
    }

    /// Run one page conversation to completion.
    pub async fn run(
        &self,
        source: &dyn PageSource,
        renderer: &mut dyn Renderer,
        questions: &mut dyn QuestionSource,
    ) -> RunOutcome {
        let mut state = ConversationState::new(self.config.context_policy);
        let mut turn = 0u64;
        set_turn(turn);

        let first = match source.fetch_page().await {
            Ok(page) => {
                renderer.on_page(&PageMeta {
                    url: page.url.clone(),
                    title: page.title.clone(),
                });
                Msg::PageLoaded(page)
            }
            Err(err) => Msg::PageFetchFailed {
                cause: err.to_string(),
            },
        };

        let mut inbox = VecDeque::from([first]);
        while let Some(msg) = inbox.pop_front() {
            let (next, effects) = update(state, msg);
            state = next;
            for effect in effects {
                if let Effect::Finish(outcome) = effect {
                    let view = state.view();
                    session_info!(
                        "Conversation finished: {:?} after {} turns",
                        outcome,
                        view.turns_completed
                    );
                    renderer.on_finish(outcome);
                    return outcome;
                }
                if let Some(msg) = self.execute(effect, &mut turn, renderer, questions).await {
                    inbox.push_back(msg);
                }
            }
        }

        // Every terminal transition emits Finish; an empty inbox means the
        // state machine stalled.
        session_warn!("Conversation stalled in {:?}", state.phase());
        state.outcome().unwrap_or(RunOutcome::Completed)
    }

    async fn execute(
        &self,
        effect: Effect,
        turn: &mut u64,
        renderer: &mut dyn Renderer,
        questions: &mut dyn QuestionSource,
    ) -> Option<Msg> {
        match effect {
            Effect::Reduce { html } => {
                let reduced = self.reducer.reduce(&html);
                session_info!(
                    "Reduced page: {} html bytes -> {} chars{}",
                    html.len(),
                    reduced.text.chars().count(),
                    if reduced.truncated { " (truncated)" } else { "" }
                );
                Some(Msg::Reduced {
                    text: reduced.text,
                    title: reduced.title,
                })
            }
            Effect::RequestTurn(request) => {
                *turn += 1;
                set_turn(*turn);
                Some(self.run_turn(request, renderer).await)
            }
            Effect::Display { kind, text } => {
                renderer.on_final(kind, &text);
                None
            }
            Effect::SaveSummary { page, title, text } => {
                let record = SummaryRecord {
                    url: page.url,
                    title,
                    model: self.config.endpoint.model.clone(),
                    text,
                };
                self.archive(&record, renderer);
                None
            }
            Effect::PromptQuestion => {
                renderer.prompt_question();
                Some(match questions.next_line() {
                    Some(line) => Msg::QuestionEntered(line),
                    None => Msg::InputClosed,
                })
            }
            Effect::ReportFailure { phase, cause } => {
                session_error!("{} failed: {}", phase, cause);
                renderer.on_failure(phase, &cause);
                None
            }
            Effect::Finish(_) => None,
        }
    }

    async fn run_turn(&self, request: TurnRequest, renderer: &mut dyn Renderer) -> Msg {
        let kind = request.kind();
        let (mode, messages) = match request {
            TurnRequest::Summary { url, title, body } => (
                PromptMode::Summarize,
                self.prompts.summarize(Some(&url), &title, &body),
            ),
            TurnRequest::Answer { context, question } => {
                match self
                    .prompts
                    .build(PromptMode::Chat, "", &context, Some(&question))
                {
                    Ok(messages) => (PromptMode::Chat, messages),
                    Err(err) => {
                        return Msg::TurnFailed {
                            cause: err.to_string(),
                        }
                    }
                }
            }
        };
        let chat_request = ChatRequest {
            messages,
            sampling: mode.sampling(&self.config.sampling),
        };
        session_debug!(
            "{:?} turn: {} messages, {} chars",
            kind,
            chat_request.messages.len(),
            chat_request
                .messages
                .iter()
                .map(|m| m.content.chars().count())
                .sum::<usize>()
        );

        renderer.on_turn_start(kind);
        let mut sink = RendererSink(renderer);
        match self.client.stream_complete(&chat_request, &mut sink).await {
            Ok(result) => Msg::TurnSucceeded {
                full_text: result.full_text,
            },
            Err(err) => {
                session_warn!("{:?} turn failed: {}", kind, err);
                Msg::TurnFailed {
                    cause: err.to_string(),
                }
            }
        }
    }

    fn archive(&self, record: &SummaryRecord, renderer: &mut dyn Renderer) {
        for archive in &self.archives {
            match archive.save(record) {
                Ok(location) => {
                    renderer.on_notice(&format!("Summary saved to {}: {}", archive.label(), location))
                }
                Err(err) => {
                    session_warn!("Archiving summary to {} failed: {}", archive.label(), err);
                    renderer.on_notice(&format!("Could not save summary to {}: {}", archive.label(), err));
                }
            }
        }
    }
}

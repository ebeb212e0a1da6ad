use crate::{
    ConversationState, Effect, FailurePhase, Msg, PageMeta, Phase, RunOutcome, TurnKind,
    TurnRequest,
};

const EXIT_COMMAND: &str = "exit";

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not apply to the current phase leave the state untouched
/// and produce no effects.
pub fn update(mut state: ConversationState, msg: Msg) -> (ConversationState, Vec<Effect>) {
    let effects = match (state.phase(), msg) {
        (Phase::Init, Msg::PageLoaded(page)) => {
            state.load_page(PageMeta {
                url: page.url,
                title: page.title,
            });
            vec![Effect::Reduce { html: page.html }]
        }
        (Phase::Init, Msg::PageFetchFailed { cause }) => {
            fail_run(&mut state, FailurePhase::PageFetch, cause)
        }
        (Phase::Summarizing, Msg::Reduced { text, title }) => {
            if text.trim().is_empty() {
                let cause = "page produced no readable text".to_string();
                fail_run(&mut state, FailurePhase::Extraction, cause)
            } else {
                state.adopt_title(title);
                let url = state.page().map(|p| p.url.clone()).unwrap_or_default();
                vec![Effect::RequestTurn(TurnRequest::Summary {
                    url,
                    title: state.title().to_string(),
                    body: text,
                })]
            }
        }
        (Phase::Summarizing, Msg::TurnSucceeded { full_text }) => {
            state.record_summary(full_text.clone());
            let mut effects = vec![Effect::Display {
                kind: TurnKind::Summary,
                text: full_text.clone(),
            }];
            if let Some(page) = state.page().cloned() {
                effects.push(Effect::SaveSummary {
                    page,
                    title: state.title().to_string(),
                    text: full_text,
                });
            }
            effects.push(Effect::PromptQuestion);
            effects
        }
        (Phase::Summarizing, Msg::TurnFailed { cause }) => {
            fail_run(&mut state, FailurePhase::Summary, cause)
        }
        (Phase::AwaitingQuestion, Msg::QuestionEntered(raw)) => {
            let question = raw.trim();
            if question.is_empty() {
                vec![Effect::PromptQuestion]
            } else if question.eq_ignore_ascii_case(EXIT_COMMAND) {
                state.finish(RunOutcome::Completed);
                vec![Effect::Finish(RunOutcome::Completed)]
            } else {
                let context = state.context_for_next_turn().map(ToOwned::to_owned);
                match context {
                    Some(context) => {
                        state.set_phase(Phase::Answering);
                        vec![Effect::RequestTurn(TurnRequest::Answer {
                            context,
                            question: question.to_string(),
                        })]
                    }
                    // Unreachable through `update`: a summary always precedes questions.
                    None => vec![Effect::PromptQuestion],
                }
            }
        }
        (Phase::AwaitingQuestion, Msg::InputClosed) => {
            state.finish(RunOutcome::Completed);
            vec![Effect::Finish(RunOutcome::Completed)]
        }
        (Phase::Answering, Msg::TurnSucceeded { full_text }) => {
            state.record_answer(full_text.clone());
            vec![
                Effect::Display {
                    kind: TurnKind::Answer,
                    text: full_text,
                },
                Effect::PromptQuestion,
            ]
        }
        (Phase::Answering, Msg::TurnFailed { cause }) => {
            // Failed answers never touch the context of the next turn.
            state.set_phase(Phase::AwaitingQuestion);
            vec![
                Effect::ReportFailure {
                    phase: FailurePhase::Answer,
                    cause,
                },
                Effect::PromptQuestion,
            ]
        }
        (_, _) => Vec::new(),
    };

    (state, effects)
}

fn fail_run(state: &mut ConversationState, phase: FailurePhase, cause: String) -> Vec<Effect> {
    let outcome = RunOutcome::Failed(phase);
    state.finish(outcome);
    vec![
        Effect::ReportFailure { phase, cause },
        Effect::Finish(outcome),
    ]
}

use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex, Once};

use pagechat_core::{FailurePhase, PageContent, PageMeta, RunOutcome, TurnKind};
use pagechat_engine::{
    ChatClient, ChatConfig, ChatRequest, ConversationLoop, ConversationTurnResult, DeltaSink,
    LineQuestions, LlmFailureKind, LlmRequestFailed, MarkdownArchive, PageFailureKind,
    PageFetchError, PageSource, PersistError, PlainRenderer, QuestionSource, Renderer, Role,
    SummaryArchive, SummaryRecord, TRUNCATION_MARKER,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const PAGE_HTML: &str = "<html><head><title>T</title></head><body><p>Hi</p><p>World</p></body></html>";

type Reply = Result<Vec<&'static str>, LlmFailureKind>;

/// Replays scripted turns and records every request it sees.
#[derive(Clone, Default)]
struct ScriptedClient {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        }
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatClient for ScriptedClient {
    async fn stream_complete(
        &self,
        request: &ChatRequest,
        sink: &mut dyn DeltaSink,
    ) -> Result<ConversationTurnResult, LlmRequestFailed> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected model call");
        match reply {
            Ok(deltas) => {
                for delta in &deltas {
                    sink.on_delta(delta);
                }
                Ok(ConversationTurnResult {
                    full_text: deltas.concat(),
                })
            }
            Err(kind) => Err(failure(kind)),
        }
    }
}

fn failure(kind: LlmFailureKind) -> LlmRequestFailed {
    LlmRequestFailed {
        kind,
        message: "scripted failure".into(),
    }
}

struct FixedPage(Result<PageContent, PageFetchError>);

#[async_trait::async_trait]
impl PageSource for FixedPage {
    async fn fetch_page(&self) -> Result<PageContent, PageFetchError> {
        self.0.clone()
    }
}

fn page(html: &str) -> FixedPage {
    FixedPage(Ok(PageContent {
        url: "https://example.com/t".into(),
        title: "T".into(),
        html: html.into(),
    }))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Page(String),
    Start(TurnKind),
    Delta(String),
    Final(TurnKind, String),
    Failure(FailurePhase),
    Notice(String),
    Prompt,
    Finish(RunOutcome),
}

#[derive(Default)]
struct RecordingRenderer {
    events: Vec<Event>,
}

impl RecordingRenderer {
    fn deltas(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Delta(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn on_page(&mut self, page: &PageMeta) {
        self.events.push(Event::Page(page.title.clone()));
    }
    fn on_turn_start(&mut self, kind: TurnKind) {
        self.events.push(Event::Start(kind));
    }
    fn on_delta(&mut self, text: &str) {
        self.events.push(Event::Delta(text.to_string()));
    }
    fn on_final(&mut self, kind: TurnKind, text: &str) {
        self.events.push(Event::Final(kind, text.to_string()));
    }
    fn on_failure(&mut self, phase: FailurePhase, _cause: &str) {
        self.events.push(Event::Failure(phase));
    }
    fn on_notice(&mut self, message: &str) {
        self.events.push(Event::Notice(message.to_string()));
    }
    fn prompt_question(&mut self) {
        self.events.push(Event::Prompt);
    }
    fn on_finish(&mut self, outcome: RunOutcome) {
        self.events.push(Event::Finish(outcome));
    }
}

struct Questions(VecDeque<&'static str>);

impl Questions {
    fn of(lines: &[&'static str]) -> Self {
        Self(lines.iter().copied().collect())
    }
}

impl QuestionSource for Questions {
    fn next_line(&mut self) -> Option<String> {
        self.0.pop_front().map(ToOwned::to_owned)
    }
}

static INIT: Once = Once::new();

fn conversation(client: &ScriptedClient) -> ConversationLoop {
    INIT.call_once(session_logging::initialize_for_tests);
    ConversationLoop::new(ChatConfig::default(), Box::new(client.clone()))
}

#[tokio::test]
async fn summary_then_exit_makes_one_model_call() {
    let client = ScriptedClient::new(vec![Ok(vec!["總結：", "測試", "\n"])]);
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&["exit"]);

    let outcome = conversation(&client)
        .run(&page(PAGE_HTML), &mut renderer, &mut questions)
        .await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(renderer.deltas(), vec!["總結：", "測試", "\n"]);
    assert_eq!(
        renderer.events,
        vec![
            Event::Page("T".into()),
            Event::Start(TurnKind::Summary),
            Event::Delta("總結：".into()),
            Event::Delta("測試".into()),
            Event::Delta("\n".into()),
            Event::Final(TurnKind::Summary, "總結：測試\n".into()),
            Event::Prompt,
            Event::Finish(RunOutcome::Completed),
        ]
    );

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    let summary = &requests[0];
    assert_eq!(summary.messages[0].role, Role::System);
    assert_eq!(summary.messages[1].role, Role::User);
    assert!(summary.messages[1].content.contains("URL: https://example.com/t\n"));
    assert!(summary.messages[1].content.contains("Hi"));
    assert!(summary.messages[1].content.contains("World"));
    assert_eq!(summary.sampling.temperature, 0.1);
}

#[tokio::test]
async fn context_rolls_forward_to_the_latest_answer() {
    let client = ScriptedClient::new(vec![
        Ok(vec!["S1"]),
        Ok(vec!["A1"]),
        Ok(vec!["A2"]),
    ]);
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&["first?", "second?", " EXIT "]);

    let outcome = conversation(&client)
        .run(&page(PAGE_HTML), &mut renderer, &mut questions)
        .await;
    assert_eq!(outcome, RunOutcome::Completed);

    let requests = client.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].messages[1].role, Role::Assistant);
    assert_eq!(requests[1].messages[1].content, "S1");
    assert_eq!(requests[1].messages[2].content, "first?");
    assert_eq!(requests[1].sampling.temperature, 0.7);
    assert_eq!(requests[2].messages[1].content, "A1");
    assert_eq!(requests[2].messages[2].content, "second?");
}

#[tokio::test]
async fn original_summary_policy_pins_the_context() {
    let client = ScriptedClient::new(vec![Ok(vec!["S1"]), Ok(vec!["A1"]), Ok(vec!["A2"])]);
    let config = ChatConfig {
        context_policy: pagechat_core::ContextPolicy::OriginalSummary,
        ..ChatConfig::default()
    };
    let driver = ConversationLoop::new(config, Box::new(client.clone()));
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&["q1", "q2"]);

    driver
        .run(&page(PAGE_HTML), &mut renderer, &mut questions)
        .await;

    let requests = client.requests();
    assert_eq!(requests[1].messages[1].content, "S1");
    assert_eq!(requests[2].messages[1].content, "S1");
}

#[tokio::test]
async fn failed_answer_keeps_previous_context() {
    let client = ScriptedClient::new(vec![
        Ok(vec!["S1"]),
        Err(LlmFailureKind::Transport),
        Ok(vec!["A2"]),
    ]);
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&["q1", "q2"]);

    let outcome = conversation(&client)
        .run(&page(PAGE_HTML), &mut renderer, &mut questions)
        .await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(renderer
        .events
        .contains(&Event::Failure(FailurePhase::Answer)));
    let requests = client.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].messages[1].content, "S1");
}

#[tokio::test]
async fn blank_questions_reprompt_without_model_calls() {
    let client = ScriptedClient::new(vec![Ok(vec!["S1"])]);
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&["", "   "]);

    let outcome = conversation(&client)
        .run(&page(PAGE_HTML), &mut renderer, &mut questions)
        .await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(client.requests().len(), 1);
    let prompts = renderer
        .events
        .iter()
        .filter(|event| **event == Event::Prompt)
        .count();
    assert_eq!(prompts, 3);
}

#[tokio::test]
async fn summary_failure_ends_the_run() {
    let client = ScriptedClient::new(vec![Err(LlmFailureKind::HttpStatus(500))]);
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&["never asked"]);

    let outcome = conversation(&client)
        .run(&page(PAGE_HTML), &mut renderer, &mut questions)
        .await;

    assert_eq!(outcome, RunOutcome::Failed(FailurePhase::Summary));
    assert!(!renderer.events.contains(&Event::Prompt));
    assert_eq!(questions.0.len(), 1);
}

#[tokio::test]
async fn page_fetch_failure_makes_no_model_calls() {
    let client = ScriptedClient::new(Vec::new());
    let source = FixedPage(Err(PageFetchError {
        kind: PageFailureKind::Automation,
        message: "Safari is not running".into(),
    }));
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&[]);

    let outcome = conversation(&client)
        .run(&source, &mut renderer, &mut questions)
        .await;

    assert_eq!(outcome, RunOutcome::Failed(FailurePhase::PageFetch));
    assert_eq!(
        renderer.events,
        vec![
            Event::Failure(FailurePhase::PageFetch),
            Event::Finish(RunOutcome::Failed(FailurePhase::PageFetch)),
        ]
    );
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn page_without_text_fails_extraction() {
    let client = ScriptedClient::new(Vec::new());
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&[]);

    let outcome = conversation(&client)
        .run(
            &page("<html><head><title>T</title></head><body></body></html>"),
            &mut renderer,
            &mut questions,
        )
        .await;

    assert_eq!(outcome, RunOutcome::Failed(FailurePhase::Extraction));
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn long_pages_are_truncated_before_the_summary_request() {
    let client = ScriptedClient::new(vec![Ok(vec!["S"])]);
    let mut config = ChatConfig::default();
    config.limits.max_content_length = 40;
    let driver = ConversationLoop::new(config, Box::new(client.clone()));
    let html = format!("<html><body><p>{}</p></body></html>", "long text ".repeat(50));
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&[]);

    driver.run(&page(&html), &mut renderer, &mut questions).await;

    let payload = &client.requests()[0].messages[1].content;
    assert!(payload.ends_with(TRUNCATION_MARKER));
}

#[tokio::test]
async fn first_summary_is_archived_once() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("output");
    let client = ScriptedClient::new(vec![Ok(vec!["總結：測試\n"]), Ok(vec!["A1"])]);
    let driver = conversation(&client).with_archive(Box::new(MarkdownArchive::new(
        out.clone(),
        Arc::new(|| "2026-01-02T03:04:05Z".into()),
    )));
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&["q1"]);

    driver
        .run(&page(PAGE_HTML), &mut renderer, &mut questions)
        .await;

    let files: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert_eq!(files.len(), 1);
    let saved = fs::read_to_string(out.join("T.md")).unwrap();
    assert!(saved.contains("model: \"qwen2.5-32b-instruct-mlx\"\n"));
    assert!(saved.ends_with("總結：測試\n"));
    assert!(!saved.contains("A1"));
}

struct BrokenArchive;

impl SummaryArchive for BrokenArchive {
    fn label(&self) -> &'static str {
        "broken"
    }

    fn save(&self, _record: &SummaryRecord) -> Result<String, PersistError> {
        Err(PersistError::Unavailable("no target".into()))
    }
}

#[tokio::test]
async fn archive_failures_do_not_stop_the_conversation() {
    let client = ScriptedClient::new(vec![Ok(vec!["S1"]), Ok(vec!["A1"])]);
    let driver = conversation(&client).with_archive(Box::new(BrokenArchive));
    let mut renderer = RecordingRenderer::default();
    let mut questions = Questions::of(&["q1", "exit"]);

    let outcome = driver
        .run(&page(PAGE_HTML), &mut renderer, &mut questions)
        .await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(client.requests().len(), 2);
    assert!(renderer
        .events
        .iter()
        .any(|event| matches!(event, Event::Notice(text) if text.contains("broken"))));
}

#[tokio::test]
async fn plain_renderer_transcript() {
    let client = ScriptedClient::new(vec![Ok(vec!["總結：", "測試"]), Ok(vec!["答"])]);
    let mut renderer = PlainRenderer::new(Vec::new());
    let mut questions = LineQuestions::new("why?\nexit\n".as_bytes());

    conversation(&client)
        .run(&page(PAGE_HTML), &mut renderer, &mut questions)
        .await;

    let transcript = String::from_utf8(renderer.into_inner()).unwrap();
    assert_eq!(
        transcript,
        "Title: T\nURL: https://example.com/t\n\
         \nSummary:\n總結：測試\n\
         \nYour question (type 'exit' to quit) > \
         \nAnswer:\n答\n\
         \nYour question (type 'exit' to quit) > Bye.\n"
    );
}

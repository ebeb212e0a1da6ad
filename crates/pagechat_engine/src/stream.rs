use std::sync::LazyLock;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use session_logging::{session_debug, session_info, session_warn};

use crate::config::{EndpointConfig, SamplingParams};
use crate::prompt::ChatMessage;
use crate::types::{LlmFailureKind, LlmRequestFailed};

const DONE_SENTINEL: &str = "[DONE]";
const ERROR_BODY_EXCERPT: usize = 200;

static REASONING_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("static regex"));

/// Receives every streamed fragment, in arrival order, as soon as it lands.
pub trait DeltaSink: Send {
    fn on_delta(&mut self, delta: &str);
}

impl<F> DeltaSink for F
where
    F: FnMut(&str) + Send,
{
    fn on_delta(&mut self, delta: &str) {
        self(delta)
    }
}

/// Uniform result of one model turn, streamed or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurnResult {
    pub full_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub sampling: SamplingParams,
}

#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    async fn stream_complete(
        &self,
        request: &ChatRequest,
        sink: &mut dyn DeltaSink,
    ) -> Result<ConversationTurnResult, LlmRequestFailed>;
}

/// One decoded network frame. `delta: None` carries no text and is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub delta: Option<String>,
}

/// Reassembles deltas in arrival order and finalizes the turn text.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    buffer: String,
    frames: usize,
    deltas: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: StreamChunk, sink: &mut dyn DeltaSink) {
        self.frames += 1;
        if let Some(delta) = chunk.delta {
            sink.on_delta(&delta);
            self.buffer.push_str(&delta);
            self.deltas += 1;
        }
    }

    /// Raw concatenation so far, reasoning spans included.
    pub fn raw(&self) -> &str {
        &self.buffer
    }

    pub fn finish(self) -> Result<ConversationTurnResult, LlmRequestFailed> {
        session_debug!(
            "Stream finished: {} frames, {} deltas, {} chars",
            self.frames,
            self.deltas,
            self.buffer.chars().count()
        );
        let full_text = strip_reasoning(&self.buffer);
        if full_text.trim().is_empty() {
            return Err(LlmRequestFailed::new(
                LlmFailureKind::EmptyResponse,
                if self.buffer.trim().is_empty() {
                    "model returned no content"
                } else {
                    "model output was empty after removing reasoning"
                },
            ));
        }
        Ok(ConversationTurnResult { full_text })
    }
}

/// Remove every `<think>…</think>` span from a finished response.
pub fn strip_reasoning(text: &str) -> String {
    REASONING_SPAN.replace_all(text, "").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    Chunk(StreamChunk),
    Done,
    ApiError(String),
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Vec<WireChoice>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    delta: Option<WireDelta>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    content: Option<String>,
}

pub(crate) fn parse_frame(data: &str) -> Result<Frame, serde_json::Error> {
    let data = data.trim();
    if data == DONE_SENTINEL {
        return Ok(Frame::Done);
    }
    let wire: WireChunk = serde_json::from_str(data)?;
    if let Some(error) = wire.error {
        let message = error
            .get("message")
            .and_then(|value| value.as_str())
            .or_else(|| error.as_str())
            .unwrap_or("error event in stream")
            .to_string();
        return Ok(Frame::ApiError(message));
    }
    let delta = wire
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content);
    Ok(Frame::Chunk(StreamChunk { delta }))
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    presence_penalty: f32,
    stream: bool,
}

/// Streaming client for OpenAI-compatible `chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct ReqwestChatClient {
    endpoint: EndpointConfig,
    client: reqwest::Client,
}

impl ReqwestChatClient {
    pub fn new(endpoint: EndpointConfig) -> Result<Self, LlmRequestFailed> {
        // Streams may run for minutes; only the connect phase is bounded.
        let client = reqwest::Client::builder()
            .connect_timeout(endpoint.connect_timeout())
            .build()
            .map_err(|err| LlmRequestFailed::new(LlmFailureKind::Transport, err.to_string()))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait::async_trait]
impl ChatClient for ReqwestChatClient {
    async fn stream_complete(
        &self,
        request: &ChatRequest,
        sink: &mut dyn DeltaSink,
    ) -> Result<ConversationTurnResult, LlmRequestFailed> {
        let body = CompletionBody {
            model: &self.endpoint.model,
            messages: &request.messages,
            temperature: request.sampling.temperature,
            max_tokens: request.sampling.max_tokens,
            top_p: request.sampling.top_p,
            presence_penalty: request.sampling.presence_penalty,
            stream: true,
        };
        let url = self.endpoint.completions_url();
        session_info!(
            "POST {} model={} messages={}",
            url,
            self.endpoint.model,
            request.messages.len()
        );

        let mut builder = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body);
        if !self.endpoint.api_key.is_empty() {
            builder = builder.bearer_auth(&self.endpoint.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| LlmRequestFailed::new(LlmFailureKind::Transport, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let excerpt: String = text.chars().take(ERROR_BODY_EXCERPT).collect();
            return Err(LlmRequestFailed::new(
                LlmFailureKind::HttpStatus(status.as_u16()),
                format!("{status}: {}", excerpt.trim()),
            ));
        }

        let mut accumulator = StreamAccumulator::new();
        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = event.map_err(|err| {
                LlmRequestFailed::new(
                    LlmFailureKind::Transport,
                    format!("stream interrupted: {err}"),
                )
            })?;
            match parse_frame(&event.data) {
                Ok(Frame::Chunk(chunk)) => accumulator.push(chunk, sink),
                Ok(Frame::Done) => break,
                Ok(Frame::ApiError(message)) => {
                    return Err(LlmRequestFailed::new(LlmFailureKind::Api, message));
                }
                Err(err) => {
                    session_warn!("Skipping undecodable stream frame: {} ({})", err, event.data);
                }
            }
        }

        accumulator.finish()
    }
}

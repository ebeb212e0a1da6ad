//! Pagechat engine: page sources, text reduction, prompts, the streaming
//! chat client and the loop that executes core effects.
mod archive;
mod config;
mod decode;
mod extract;
mod fetch;
mod filename;
mod page_source;
mod persist;
mod prompt;
mod reduce;
mod render;
mod session;
mod stream;
mod truncate;
mod types;

pub use archive::{build_summary_document, Clock, MarkdownArchive, SummaryArchive, SummaryRecord};
pub use config::{
    load_config, ArchiveConfig, ChatConfig, ConfigError, EndpointConfig, Limits, PromptProfile,
    SamplingByMode, SamplingParams,
};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use extract::ReadabilityExtractor;
pub use fetch::{FetchSettings, HtmlDownload, ReqwestFetcher};
pub use filename::summary_filename;
pub use page_source::{PageSource, SafariPageSource, UrlPageSource};
pub use persist::{OutputDir, PersistError};
pub use prompt::{ChatMessage, PromptBuilder, PromptError, PromptMode, Role};
pub use reduce::{
    ExtractedText, ReducedText, Reducer, ReductionStrategy, TagStripExtractor, TextExtractor,
    DEFAULT_MAX_CONTENT_LENGTH,
};
pub use render::{LineQuestions, PlainRenderer, QuestionSource, Renderer};
pub use session::ConversationLoop;
pub use stream::{
    strip_reasoning, ChatClient, ChatRequest, ConversationTurnResult, DeltaSink,
    ReqwestChatClient, StreamAccumulator, StreamChunk,
};
pub use truncate::{truncate_content, Truncated, TRUNCATION_MARKER};
pub use types::{LlmFailureKind, LlmRequestFailed, PageFailureKind, PageFetchError};

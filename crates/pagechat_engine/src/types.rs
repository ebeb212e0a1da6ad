use std::fmt;

/// Why the page source could not produce a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("page fetch failed ({kind}): {message}")]
pub struct PageFetchError {
    pub kind: PageFailureKind,
    pub message: String,
}

impl PageFetchError {
    pub(crate) fn new(kind: PageFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    /// The browser automation script failed or returned nothing usable.
    Automation,
    Network,
}

impl fmt::Display for PageFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageFailureKind::InvalidUrl => write!(f, "invalid url"),
            PageFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            PageFailureKind::Timeout => write!(f, "timeout"),
            PageFailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            PageFailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            PageFailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            PageFailureKind::Decode => write!(f, "decode error"),
            PageFailureKind::Automation => write!(f, "browser automation error"),
            PageFailureKind::Network => write!(f, "network error"),
        }
    }
}

/// The single failure condition of a model turn.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("LLM request failed ({kind}): {message}")]
pub struct LlmRequestFailed {
    pub kind: LlmFailureKind,
    pub message: String,
}

impl LlmRequestFailed {
    pub(crate) fn new(kind: LlmFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmFailureKind {
    Transport,
    HttpStatus(u16),
    /// The endpoint reported an error inside the event stream.
    Api,
    /// Nothing usable remained after filtering reasoning spans.
    EmptyResponse,
    /// The request could not be built from the prompt inputs.
    InvalidRequest,
}

impl fmt::Display for LlmFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmFailureKind::Transport => write!(f, "transport error"),
            LlmFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            LlmFailureKind::Api => write!(f, "api error"),
            LlmFailureKind::EmptyResponse => write!(f, "empty response"),
            LlmFailureKind::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

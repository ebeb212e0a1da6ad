use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use session_logging::session_debug;

use crate::types::{PageFailureKind, PageFetchError};

/// Limits applied when a page is downloaded instead of read from the browser.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec!["text/html".into(), "application/xhtml+xml".into()],
        }
    }
}

/// Raw page bytes plus what the server said about them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDownload {
    pub final_url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    pub async fn fetch(&self, url: &str) -> Result<HtmlDownload, PageFetchError> {
        let url = reqwest::Url::parse(url)
            .map_err(|err| PageFetchError::new(PageFailureKind::InvalidUrl, err.to_string()))?;
        let response = self
            .client()?
            .get(url)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageFetchError::new(
                PageFailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        if let Some(declared) = content_type.as_deref() {
            if !is_allowed(&self.settings.allowed_content_types, declared) {
                return Err(PageFetchError::new(
                    PageFailureKind::UnsupportedContentType {
                        content_type: declared.to_owned(),
                    },
                    "not an HTML document",
                ));
            }
        }

        let final_url = response.url().to_string();
        let bytes = self.read_capped(response).await?;
        session_debug!("Downloaded {} bytes from {}", bytes.len(), final_url);
        Ok(HtmlDownload {
            final_url,
            content_type,
            bytes,
        })
    }

    fn client(&self) -> Result<reqwest::Client, PageFetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.settings.redirect_limit))
            .build()
            .map_err(|err| PageFetchError::new(PageFailureKind::Network, err.to_string()))
    }

    /// Collect the body, giving up as soon as it exceeds `max_bytes`.
    async fn read_capped(&self, response: reqwest::Response) -> Result<Vec<u8>, PageFetchError> {
        let max = self.settings.max_bytes;
        if let Some(declared) = response.content_length().filter(|len| *len > max) {
            return Err(too_large(max, declared));
        }

        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(classify)?;
            let len = (body.len() + chunk.len()) as u64;
            if len > max {
                return Err(too_large(max, len));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn is_allowed(allowed: &[String], content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    allowed.iter().any(|candidate| candidate.eq_ignore_ascii_case(mime))
}

fn too_large(max_bytes: u64, actual: u64) -> PageFetchError {
    PageFetchError::new(
        PageFailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "page exceeds the download limit",
    )
}

fn classify(err: reqwest::Error) -> PageFetchError {
    let kind = if err.is_timeout() {
        PageFailureKind::Timeout
    } else if err.is_redirect() {
        PageFailureKind::RedirectLimitExceeded
    } else {
        PageFailureKind::Network
    };
    PageFetchError::new(kind, err.to_string())
}

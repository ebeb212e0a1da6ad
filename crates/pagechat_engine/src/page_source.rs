use pagechat_core::PageContent;
use scraper::{Html, Selector};
use session_logging::{session_debug, session_info};
use tokio::process::Command;

use crate::decode::decode_html;
use crate::fetch::{FetchSettings, ReqwestFetcher};
use crate::types::{PageFailureKind, PageFetchError};

/// Produces the page the conversation is about.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self) -> Result<PageContent, PageFetchError>;
}

const URL_AND_TITLE_SCRIPT: &str = r#"
tell application "Safari"
    set currentURL to URL of document 1
    set pageTitle to name of document 1
    return currentURL & ", " & pageTitle
end tell
"#;

const PAGE_SOURCE_SCRIPT: &str = r#"
tell application "Safari"
    tell document 1
        set theSource to source
    end tell
end tell
return theSource
"#;

/// Front Safari document, read through `osascript`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafariPageSource;

impl SafariPageSource {
    async fn run_script(script: &str) -> Result<String, PageFetchError> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .await
            .map_err(|err| {
                PageFetchError::new(
                    PageFailureKind::Automation,
                    format!("could not run osascript: {err}"),
                )
            })?;
        if !output.status.success() {
            return Err(PageFetchError::new(
                PageFailureKind::Automation,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl PageSource for SafariPageSource {
    async fn fetch_page(&self) -> Result<PageContent, PageFetchError> {
        let url_and_title = Self::run_script(URL_AND_TITLE_SCRIPT).await?;
        let (url, title) = split_url_and_title(&url_and_title).ok_or_else(|| {
            PageFetchError::new(
                PageFailureKind::Automation,
                format!("unexpected url/title output: {:?}", url_and_title.trim()),
            )
        })?;
        session_info!("Safari page: {} ({})", title, url);

        let html = Self::run_script(PAGE_SOURCE_SCRIPT).await?;
        if html.trim().is_empty() {
            return Err(PageFetchError::new(
                PageFailureKind::Automation,
                "Safari returned an empty page source",
            ));
        }
        session_debug!("Safari page source: {} bytes", html.len());
        Ok(PageContent { url, title, html })
    }
}

fn split_url_and_title(raw: &str) -> Option<(String, String)> {
    let (url, title) = raw.trim().split_once(", ")?;
    if url.is_empty() {
        return None;
    }
    Some((url.to_string(), title.to_string()))
}

/// Downloads a page over HTTP instead of asking the browser.
#[derive(Debug, Clone)]
pub struct UrlPageSource {
    url: String,
    fetcher: ReqwestFetcher,
}

impl UrlPageSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_settings(url, FetchSettings::default())
    }

    pub fn with_settings(url: impl Into<String>, settings: FetchSettings) -> Self {
        Self {
            url: url.into(),
            fetcher: ReqwestFetcher::new(settings),
        }
    }
}

#[async_trait::async_trait]
impl PageSource for UrlPageSource {
    async fn fetch_page(&self) -> Result<PageContent, PageFetchError> {
        let download = self.fetcher.fetch(&self.url).await?;
        let decoded = decode_html(&download.bytes, download.content_type.as_deref())
            .map_err(|err| PageFetchError::new(PageFailureKind::Decode, err.to_string()))?;
        session_info!(
            "Fetched {} ({} bytes, {})",
            download.final_url,
            download.bytes.len(),
            decoded.encoding_label
        );
        let title = document_title(&decoded.html).unwrap_or_else(|| download.final_url.clone());
        Ok(PageContent {
            url: download.final_url,
            title,
            html: decoded.html,
        })
    }
}

fn document_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("title").ok()?;
    doc.select(&sel)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

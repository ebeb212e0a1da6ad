use std::path::PathBuf;
use std::sync::Arc;

use session_logging::session_info;

use crate::filename::summary_filename;
use crate::persist::{OutputDir, PersistError};

/// The first successful summary of a page, ready to be archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub url: String,
    pub title: String,
    pub model: String,
    pub text: String,
}

/// Somewhere a finished summary can be kept after the run.
pub trait SummaryArchive: Send + Sync {
    /// Human-readable label used in notices, e.g. "file".
    fn label(&self) -> &'static str;

    /// Store the record; returns where it went.
    fn save(&self, record: &SummaryRecord) -> Result<String, PersistError>;
}

pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// Writes `{output_dir}/{sanitized title}.md` with a small front matter block.
pub struct MarkdownArchive {
    dir: OutputDir,
    clock: Clock,
}

impl MarkdownArchive {
    pub fn new(output_dir: PathBuf, clock: Clock) -> Self {
        Self {
            dir: OutputDir::new(output_dir),
            clock,
        }
    }
}

impl SummaryArchive for MarkdownArchive {
    fn label(&self) -> &'static str {
        "file"
    }

    fn save(&self, record: &SummaryRecord) -> Result<String, PersistError> {
        let filename = summary_filename(&record.title);
        let document = build_summary_document(record, &(self.clock)());
        let path = self.dir.write_atomic(&filename, &document)?;
        session_info!(
            "Saved summary ({} chars) to {:?}",
            record.text.chars().count(),
            path
        );
        Ok(path.display().to_string())
    }
}

pub fn build_summary_document(record: &SummaryRecord, saved_utc: &str) -> String {
    let frontmatter = format!(
        "---\nurl: {url}\ntitle: {title}\nmodel: {model}\nsaved_utc: {saved_utc}\n---\n\n",
        url = yaml_quoted(&record.url),
        title = yaml_quoted(&record.title),
        model = yaml_quoted(&record.model),
        saved_utc = saved_utc,
    );
    format!("{frontmatter}{body}\n", body = record.text.trim())
}

/// Double-quoted YAML scalar on a single line.
fn yaml_quoted(value: &str) -> String {
    let flat = value.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("\"{}\"", flat.replace('\\', "\\\\").replace('"', "\\\""))
}

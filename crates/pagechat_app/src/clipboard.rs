use arboard::Clipboard;
use pagechat_engine::{PersistError, SummaryArchive, SummaryRecord};
use session_logging::session_info;

/// Copies the summary text to the system clipboard.
#[derive(Debug, Default)]
pub(crate) struct ClipboardArchive;

impl SummaryArchive for ClipboardArchive {
    fn label(&self) -> &'static str {
        "clipboard"
    }

    fn save(&self, record: &SummaryRecord) -> Result<String, PersistError> {
        let mut clipboard =
            Clipboard::new().map_err(|err| PersistError::Unavailable(err.to_string()))?;
        clipboard
            .set_text(record.text.clone())
            .map_err(|err| PersistError::Unavailable(err.to_string()))?;
        session_info!("Copied summary ({} chars) to clipboard", record.text.chars().count());
        Ok(format!("{} chars", record.text.chars().count()))
    }
}

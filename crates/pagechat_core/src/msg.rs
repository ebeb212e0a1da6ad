use crate::PageContent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The page source produced the current page.
    PageLoaded(PageContent),
    /// The page source could not produce a page.
    PageFetchFailed { cause: String },
    /// Reduction finished; `title` is the reducer's cleaned title, if any.
    Reduced { text: String, title: Option<String> },
    /// A model turn streamed to completion.
    TurnSucceeded { full_text: String },
    /// A model turn failed before producing usable text.
    TurnFailed { cause: String },
    /// The user entered a line at the question prompt.
    QuestionEntered(String),
    /// The question source reached end of input.
    InputClosed,
}

//! Pagechat core: pure conversation state machine and view helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, TurnKind, TurnRequest};
pub use msg::Msg;
pub use state::{
    ContextPolicy, ConversationState, FailurePhase, PageContent, PageMeta, Phase, RunOutcome,
};
pub use update::update;
pub use view_model::ConversationView;

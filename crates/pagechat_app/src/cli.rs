use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use pagechat_engine::{ChatConfig, ReductionStrategy};
use session_logging::LogDestination;

/// Summarize the current browser page, then chat about it.
#[derive(Debug, Parser)]
#[command(name = "pagechat", version)]
pub(crate) struct Args {
    /// Page to download and summarize instead of the front Safari document.
    pub url: Option<String>,

    /// RON configuration file; a missing file means defaults.
    #[arg(long, default_value = "pagechat.ron")]
    pub config: PathBuf,

    /// API key for the chat endpoint.
    #[arg(long, env = "PAGECHAT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL, e.g. http://localhost:1234/v1.
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Keep every visible text node instead of picking the main content.
    #[arg(long)]
    pub generic: bool,

    /// Plain text output without colors or markdown rendering.
    #[arg(long)]
    pub plain: bool,

    /// Do not write the summary to the output directory.
    #[arg(long)]
    pub no_save: bool,

    /// Copy the summary to the clipboard.
    #[arg(long)]
    pub copy: bool,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Also log to stderr, at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Command-line values win over the file and the environment.
    pub fn apply(&self, config: &mut ChatConfig) {
        if let Some(key) = &self.api_key {
            config.endpoint.api_key = key.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.endpoint.base_url = base_url.clone();
        }
        if let Some(model) = &self.model {
            config.endpoint.model = model.clone();
        }
        if self.generic {
            config.reduction = ReductionStrategy::Generic;
        }
        if self.no_save {
            config.archive.enabled = false;
        }
        if let Some(dir) = &self.output_dir {
            config.archive.output_dir = dir.display().to_string();
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        if self.verbose {
            LogDestination::Both
        } else {
            LogDestination::File
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

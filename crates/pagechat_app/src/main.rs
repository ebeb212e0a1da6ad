mod cli;
mod clipboard;
mod rich;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pagechat_core::RunOutcome;
use pagechat_engine::{
    load_config, Clock, ConversationLoop, LineQuestions, MarkdownArchive, PageSource,
    PlainRenderer, Renderer, ReqwestChatClient, SafariPageSource, UrlPageSource,
};
use session_logging::{session_error, session_info};

use cli::Args;
use clipboard::ClipboardArchive;
use rich::RichRenderer;

fn main() -> ExitCode {
    let args = Args::parse();
    session_logging::initialize(args.log_destination(), args.log_level());

    match run(&args) {
        Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            session_error!("Startup failed: {:#}", err);
            eprintln!("pagechat: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<RunOutcome> {
    let mut config = load_config(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    args.apply(&mut config);
    session_info!(
        "Endpoint {} model {} ({:?} reduction, {:?} context)",
        config.endpoint.base_url,
        config.endpoint.model,
        config.reduction,
        config.context_policy
    );

    let client = ReqwestChatClient::new(config.endpoint.clone())
        .context("building the chat client")?;
    let mut conversation = ConversationLoop::new(config.clone(), Box::new(client));
    if config.archive.enabled {
        conversation = conversation.with_archive(Box::new(MarkdownArchive::new(
            PathBuf::from(&config.archive.output_dir),
            utc_clock(),
        )));
    }
    if args.copy {
        conversation = conversation.with_archive(Box::new(ClipboardArchive));
    }

    let source: Box<dyn PageSource> = match &args.url {
        Some(url) => Box::new(UrlPageSource::new(url.clone())),
        None => Box::new(SafariPageSource),
    };
    let mut renderer: Box<dyn Renderer> = if args.plain {
        Box::new(PlainRenderer::new(io::stdout()))
    } else {
        Box::new(RichRenderer::new(io::stdout(), config.prompt.summary_label.clone()))
    };
    let mut questions = LineQuestions::new(io::stdin().lock());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;
    Ok(runtime.block_on(conversation.run(source.as_ref(), renderer.as_mut(), &mut questions)))
}

fn utc_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

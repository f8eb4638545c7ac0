//! replybot daemon: load config, wire collaborators, run until interrupted.

use clap::Parser;
use replybot::config::Config;
use replybot::llm::OpenAiGenerator;
use replybot::messaging::ConsoleChat;
use replybot::responder::Responder;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "replybot", about = "Debounced auto-reply daemon for chat conversations")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = Config::load(&cli.config)?;
    tracing::info!(
        model = %config.llm.model,
        history_window = config.history_window,
        conversations = config.conversations.len(),
        "replybot starting"
    );
    for conversation in &config.conversations {
        tracing::info!(
            nickname = %conversation.nickname,
            enabled = conversation.enabled,
            wait_secs = conversation.wait_secs,
            "configured conversation"
        );
    }

    let generator = Arc::new(OpenAiGenerator::new(config.llm.clone())?);
    let console = Arc::new(ConsoleChat::new());
    let responder = Responder::new(&config, generator, console.clone());

    responder.seed_from(console.as_ref()).await;

    tokio::select! {
        result = console.run(&responder) => {
            result?;
            tracing::info!("console input closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    responder.shutdown().await;
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_directives = if debug {
        "replybot=debug,info"
    } else {
        "replybot=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use abroadly::config::Config;
use abroadly::llm::{LlmProvider, OpenAiProvider};
use abroadly::session::Session;

#[derive(Parser)]
#[command(name = "abroadly", about = "Conversational study-abroad intake assistant")]
struct Cli {
    /// Model for the conversational reply (overrides ABROADLY_CHAT_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// Model for profile extraction (overrides ABROADLY_EXTRACT_MODEL).
    #[arg(long)]
    extract_model: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint (overrides LLM_BASE_URL).
    #[arg(long)]
    base_url: Option<String>,

    /// Directory for the end-of-session documents (overrides ABROADLY_OUTPUT_DIR).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(model) = self.model {
            // If extraction follows the chat model, keep them together.
            if config.llm.extract_model == config.llm.chat_model {
                config.llm.extract_model = model.clone();
            }
            config.llm.chat_model = model;
        }
        if let Some(model) = self.extract_model {
            config.llm.extract_model = model;
        }
        if let Some(base_url) = self.base_url {
            config.llm.base_url = base_url;
        }
        if let Some(dir) = self.output_dir {
            config.session.output_dir = dir;
        }
        if let Some(secs) = self.timeout_secs {
            config.llm.request_timeout = std::time::Duration::from_secs(secs);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the chat on stdout.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("abroadly=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    cli.apply(&mut config);

    let chat_provider: Arc<dyn LlmProvider> =
        Arc::new(OpenAiProvider::new(&config.llm, config.llm.chat_model.clone())?);
    let extract_provider: Arc<dyn LlmProvider> = if config.llm.extract_model
        == config.llm.chat_model
    {
        Arc::clone(&chat_provider)
    } else {
        Arc::new(OpenAiProvider::new(&config.llm, config.llm.extract_model.clone())?)
    };

    tracing::info!(
        chat_model = %config.llm.chat_model,
        extract_model = %config.llm.extract_model,
        base_url = %config.llm.base_url,
        "Starting intake session"
    );

    let mut session = Session::new(chat_provider, extract_provider, config);
    session.run().await?;

    Ok(())
}

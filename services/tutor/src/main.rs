//! Terminal front end for the tutor.
//!
//! Runs one tutoring session over stdin/stdout. Logs go to stderr so the
//! conversation stays readable.

use anyhow::{Context, Result};
use async_openai::config::OpenAIConfig;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tutor_core::{
    CannedContentGenerator, ContentGenerator, LLMContentGenerator, QuestionBank, Tutor,
    TutorSettings, generator::load_prompts, llm_client::OpenAICompatibleClient,
};

/// Adaptive math tutor for the terminal.
#[derive(Parser, Debug)]
#[command(name = "tutor-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Topic to study (defaults to Fractions)
    #[arg(short, long)]
    topic: Option<String>,

    /// Use prewritten content instead of calling an LLM
    #[arg(long)]
    offline: bool,

    /// Chat model for generated content
    #[arg(short, long, env = "CHAT_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Directory holding the prompt templates
    #[arg(short, long, env = "PROMPTS_PATH", default_value = "./prompts")]
    prompts: PathBuf,
}

fn build_generator(args: &Args, bank: Arc<QuestionBank>) -> Result<Arc<dyn ContentGenerator>> {
    if args.offline {
        info!("Using offline content from the question bank.");
        return Ok(Arc::new(CannedContentGenerator::new(bank)));
    }
    let api_key = std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY must be set unless --offline is given")?;
    let prompts = load_prompts(&args.prompts)?;
    let client = OpenAICompatibleClient::new(
        OpenAIConfig::new().with_api_key(api_key),
        args.model.clone(),
    );
    info!(model = %args.model, "Using OpenAI provider.");
    Ok(Arc::new(LLMContentGenerator::new(Arc::new(client), prompts)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let bank = Arc::new(QuestionBank::builtin());
    let generator = build_generator(&args, bank.clone())?;
    let tutor = Tutor::new(generator, bank, TutorSettings::default());

    let (session_id, welcome) = tutor.create_session(args.topic.as_deref()).await;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{welcome}\n\n> ").as_bytes()).await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        let reply = tutor.handle_turn(session_id, line).await;
        stdout.write_all(format!("\n{reply}\n\n> ").as_bytes()).await?;
        stdout.flush().await?;
    }

    stdout.write_all("\nBye! Keep practicing! 👋\n".as_bytes()).await?;
    Ok(())
}

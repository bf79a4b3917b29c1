//! converse: read a line, print a reply.
//!
//! A small terminal front end over [`converse_ai::Session`]. Keys come from
//! `OPENAI_API_KEY` (comma-separated for several), options from the config
//! file. Lines starting with `/` are commands: `/reset`, `/usage`, `/quit`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use converse_ai::{
    BpeTokenizer, ConversationId, InMemoryKeyStore, OpenAiClient, OpenAiConfig, Session,
};
use converse_config::ConverseConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "converse", about = "Chat with an OpenAI model from the terminal")]
struct Args {
    /// Config file (defaults to the platform config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Conversation id.
    #[arg(long, default_value = "default")]
    conversation: String,

    /// Your name, as shown to the model.
    #[arg(short, long, default_value = converse_ai::DEFAULT_USER_NAME)]
    name: String,

    /// Override the configured model.
    #[arg(short, long)]
    model: Option<String>,

    /// Wait for whole replies instead of streaming them.
    #[arg(long)]
    no_stream: bool,

    /// Drop conversations idle for longer than this many seconds.
    #[arg(long, default_value_t = 3600)]
    idle_ttl: u64,
}

fn load_config(args: &Args) -> Result<ConverseConfig, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => converse_config::load_from_path(path)?,
        None => converse_config::load_default()?,
    };
    Ok(config)
}

/// Fold command-line options into the file config, so everything built
/// from it (tokenizer included) sees them.
fn apply_cli_overrides(config: &mut ConverseConfig, args: &Args) {
    if let Some(model) = &args.model {
        config.options.model = Some(model.clone());
    }
}

fn api_keys() -> Vec<String> {
    std::env::var("OPENAI_API_KEY")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = load_config(&args)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_filter().into()),
        )
        .init();

    let keys = api_keys();
    if keys.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set, every request will fail");
    }

    apply_cli_overrides(&mut config, &args);
    let options = config.effective_options();
    let tokenizer = BpeTokenizer::for_model(&options.model)?;
    let client = OpenAiClient::new(OpenAiConfig::from_transport(&config.transport))?;
    let session = Arc::new(Session::from_config(
        &config,
        Arc::new(client),
        Arc::new(InMemoryKeyStore::new(keys)),
        Arc::new(tokenizer),
    )?);

    // Idle conversation reaper.
    let store = session.store().clone();
    let ttl = Duration::from_secs(args.idle_ttl);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let cutoff = chrono::Utc::now() - ttl;
            let dropped = store.retain(|c| c.last_active >= cutoff).await;
            if dropped > 0 {
                tracing::debug!(dropped, "reaped idle conversations");
            }
        }
    });

    let id = ConversationId::new(args.conversation.clone());
    tracing::info!(conversation = %id, model = %session.options().model, "converse ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt_marker(&args.name)?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset(&id).await;
                println!("(conversation cleared)");
            }
            "/usage" => {
                let usage = session.usage().await;
                println!(
                    "{} calls, {} prompt + {} completion tokens, cost {:.5}",
                    usage.call_count(),
                    usage.total().prompt_tokens,
                    usage.total().completion_tokens,
                    usage.cost()
                );
            }
            text => {
                let result = if args.no_stream {
                    session.ask(text, &id, &args.name).await.map(|reply| {
                        println!("{reply}");
                    })
                } else {
                    session
                        .ask_stream(
                            |fragment| {
                                print!("{fragment}");
                                let _ = std::io::stdout().flush();
                            },
                            |usage| {
                                tracing::debug!(total_tokens = usage.total_tokens, "usage");
                            },
                            text,
                            &id,
                            &args.name,
                        )
                        .await
                        .map(|_| println!())
                };
                if let Err(e) = result {
                    eprintln!("error: {e}");
                }
            }
        }
        prompt_marker(&args.name)?;
    }

    Ok(())
}

fn prompt_marker(name: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{name}> ")?;
    stdout.flush()
}

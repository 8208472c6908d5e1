use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexr::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexr=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            model,
            port,
            host,
            dev,
        } => {
            lexr::cli::serve(config, model, port, host, dev).await?;
        }
        Commands::Define {
            word,
            lang,
            phrase,
            answer_lang,
            model,
            config,
        } => {
            lexr::cli::define(word, lang, phrase, answer_lang, model, config).await?;
        }
        Commands::Sign {
            client_id,
            secret,
            body,
            query,
            timestamp,
        } => {
            lexr::cli::sign(client_id, secret, body, query, timestamp)?;
        }
        Commands::Pull {
            model,
            file,
            tokenizer_repo,
            output,
        } => {
            lexr::cli::pull(model, file, tokenizer_repo, output).await?;
        }
        Commands::Models { verbose } => {
            lexr::cli::models(verbose).await?;
        }
    }

    Ok(())
}

//! CLI commands

mod define;
mod models;
mod pull;
mod serve;
mod sign;

pub use define::define;
pub use models::models;
pub use pull::pull;
pub use serve::serve;
pub use sign::sign;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Lexr - signed dictionary definitions from a local language model
#[derive(Parser)]
#[command(name = "lexr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the dictionary server
    Serve {
        /// Configuration file (YAML or JSON)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Catalog id or path to a GGUF model
        #[arg(long, short)]
        model: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Development mode: skip HMAC verification
        #[arg(long)]
        dev: bool,
    },

    /// Define a word locally, without the server
    Define {
        /// Word to define
        word: String,

        /// Language of the word
        #[arg(long, short)]
        lang: String,

        /// Phrase the word appears in
        #[arg(long, short)]
        phrase: Option<String>,

        /// Language of the answer (default: french)
        #[arg(long, short)]
        answer_lang: Option<String>,

        /// Catalog id or path to a GGUF model
        #[arg(long, short)]
        model: Option<String>,

        /// Configuration file (YAML or JSON)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Print the authentication headers for a request
    Sign {
        /// Client identifier
        #[arg(long, default_value = "cli")]
        client_id: String,

        /// Shared secret
        #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
        secret: String,

        /// JSON request body
        #[arg(long, default_value = "{}")]
        body: String,

        /// Query string, without the leading '?'
        #[arg(long)]
        query: Option<String>,

        /// Timestamp to sign (default: now)
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Download a model from HuggingFace Hub
    Pull {
        /// Catalog id, or a repository id used with --file
        model: String,

        /// GGUF file inside the repository
        #[arg(long)]
        file: Option<String>,

        /// Repository holding tokenizer.json (default: the model repository)
        #[arg(long)]
        tokenizer_repo: Option<String>,

        /// Output directory
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// List catalog models and local GGUF files
    Models {
        /// Show detailed information
        #[arg(long, short)]
        verbose: bool,
    },
}

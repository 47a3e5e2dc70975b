//! Command-line interface parsing and handling
//!
//! This module parses arguments, resolves the effective configuration and
//! dispatches to the interactive loop or the one-shot command.

pub mod chat;
pub mod say;
pub mod transcript;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::chat::run_chat;
use crate::cli::say::run_say;
use crate::core::backend::RequestFormat;
use crate::core::config::{BackendKind, Config};
use crate::core::locale::Locale;
use crate::utils::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "berrychat")]
#[command(about = "Stream chat replies from a local proxy or an OpenAI-compatible API")]
#[command(
    long_about = "berrychat sends prompts to a chat backend and prints the reply as it streams in.\n\n\
By default it posts to a local proxy route (http://localhost:3000/api/chat). With --direct it \
calls an OpenAI-compatible API instead.\n\n\
Environment Variables:\n\
  DEEPSEEK_API_KEY  API key used by the direct backend\n\
  DEEPSEEK_API_URL  Base URL for the direct backend (defaults to https://api.deepseek.com)\n\
  RUST_LOG          Diagnostic log filter (logs go to stderr)\n\n\
Controls:\n\
  Enter             Send the prompt\n\
  Ctrl+C            Stop the reply in progress, or quit when idle\n\
  Ctrl+D            Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Proxy endpoint to post chat requests to
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Call the OpenAI-compatible API directly instead of the proxy
    #[arg(short = 'd', long, global = true)]
    pub direct: bool,

    /// Model used by the direct backend
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Send only the new prompt to the proxy instead of the whole history
    #[arg(long, global = true)]
    pub single: bool,

    /// Language for built-in messages
    #[arg(long, global = true, value_enum)]
    pub locale: Option<Locale>,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Send one prompt and print the reply
    Say {
        /// Prompt text; multiple words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Show the effective configuration
    Config,
}

impl Args {
    /// Layers the flags over an already loaded and environment-adjusted
    /// configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if self.direct {
            config.backend = Some(BackendKind::Direct);
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if self.single {
            config.request_format = Some(RequestFormat::Single);
        }
        if let Some(locale) = self.locale {
            config.locale = Some(locale);
        }
    }
}

/// Loads the file, then the environment, then the flags, later sources
/// winning.
pub fn resolve_config(args: &Args) -> Result<(Config, PathBuf), Box<dyn Error>> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::get_config_path()?,
    };
    let mut config = Config::load_from_path(&path)?;
    config.apply_env(|name| std::env::var(name).ok());
    args.apply_overrides(&mut config);
    Ok((config, path))
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let (config, path) = resolve_config(&args)?;

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(&config).await,
        Commands::Say { prompt } => run_say(prompt, &config).await,
        Commands::Config => {
            config.print_all(&path);
            Ok(())
        }
    }
}

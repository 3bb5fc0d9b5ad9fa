//! Command line argument parsing
//!
//! Subcommands:
//! - `generate`: Single rate-limited completion
//! - `evaluate`: Best-of-three generation with a selection pass
//! - `run`: Process a batch of candidate records into scheduled emails
//! - `show-config`: Show configuration discovery information

use crate::llm::{LLMError, ProviderKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Generate(GenerateConfig),
    Evaluate(EvaluateConfig),
    Outreach(OutreachConfig),
    ShowConfig,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_override: Option<PathBuf>,
    pub credentials_override: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct GenerateConfig {
    pub prompt: String,
    /// Raw selector; see `provider_kind`.
    pub provider: String,
    pub global: GlobalOptions,
}

#[derive(Debug)]
pub struct EvaluateConfig {
    pub prompt: String,
    pub criteria: String,
    pub provider: String,
    pub global: GlobalOptions,
}

impl GenerateConfig {
    /// Resolve the selector; checked before credentials or config are loaded.
    pub fn provider_kind(&self) -> Result<ProviderKind, LLMError> {
        self.provider.parse()
    }
}

impl EvaluateConfig {
    pub fn provider_kind(&self) -> Result<ProviderKind, LLMError> {
        self.provider.parse()
    }
}

#[derive(Debug)]
pub struct OutreachConfig {
    pub records: PathBuf,
    pub dry_run: bool,
    pub global: GlobalOptions,
}

#[derive(Debug, Parser)]
#[command(name = "reachout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rate-limited multi-provider text generation with best-of-N selection")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Credentials JSON file path
    #[arg(long = "credentials", global = true)]
    pub credentials: Option<PathBuf>,
    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a single completion
    Generate {
        /// Prompt text
        prompt: String,
        /// Provider or model name (openai, gemini, gpt-3.5-turbo, gemini-pro)
        #[arg(short = 'p', long = "provider", default_value = "gemini")]
        provider: String,
    },
    /// Generate three candidates and let the provider pick the best
    Evaluate {
        /// Prompt text
        prompt: String,
        /// Criteria the selection pass judges against
        #[arg(long = "criteria")]
        criteria: String,
        /// Provider or model name
        #[arg(short = 'p', long = "provider", default_value = "gemini")]
        provider: String,
    },
    /// Process pending candidate records
    Run {
        /// JSON file holding the candidate records
        #[arg(short = 'r', long = "records")]
        records: PathBuf,
        /// Record scheduled emails without dispatching them
        #[arg(short = 'n', long = "dry-run")]
        dry_run: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            config_override: self.config.clone(),
            credentials_override: self.credentials.clone(),
            verbose: self.verbose,
        }
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Generate { prompt, provider }) => {
                Ok(ExecutionMode::Generate(GenerateConfig {
                    prompt: prompt.clone(),
                    provider: provider.clone(),
                    global: self.global_options(),
                }))
            }
            Some(Commands::Evaluate {
                prompt,
                criteria,
                provider,
            }) => Ok(ExecutionMode::Evaluate(EvaluateConfig {
                prompt: prompt.clone(),
                criteria: criteria.clone(),
                provider: provider.clone(),
                global: self.global_options(),
            })),
            Some(Commands::Run { records, dry_run }) => {
                Ok(ExecutionMode::Outreach(OutreachConfig {
                    records: records.clone(),
                    dry_run: *dry_run,
                    global: self.global_options(),
                }))
            }
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            None => Err(
                "No command specified. Use 'reachout --help' to see available commands."
                    .to_string(),
            ),
        }
    }
}

//! # Reachout
//!
//! A multi-provider text generation layer with a shared sliding-window rate
//! limit and best-of-N response selection, plus a batch outreach pipeline
//! built on top of it.
//!
//! ## Architecture Overview
//!
//! - **[`llm`]**: Provider adapters, retry policies, the rate limiter, the
//!   generation dispatcher and the best-of-N evaluator
//! - **[`credentials`]**: Provider secret loading from JSON or environment
//! - **[`outreach`]**: Record store, query/search/compose/schedule pipeline
//! - **[`cli`]**: Argument parsing and TOML configuration discovery
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reachout::{
//!     BestOfNEvaluator, Credentials, EvaluationConfig, GenerationDispatcher, ProviderKind,
//!     SlidingWindowLimiter,
//! };
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = Credentials::from_env()?;
//!     let limiter = Arc::new(SlidingWindowLimiter::default());
//!     let dispatcher = Arc::new(GenerationDispatcher::from_credentials(
//!         &credentials,
//!         limiter,
//!         HashMap::new(),
//!     )?);
//!
//!     let evaluator = BestOfNEvaluator::new(dispatcher, EvaluationConfig::default());
//!     let best = evaluator
//!         .generate_and_evaluate("Describe Rust in one line", "clarity", ProviderKind::Gemini)
//!         .await?;
//!
//!     println!("{best}");
//!     Ok(())
//! }
//! ```

/// Command line parsing and configuration discovery.
pub mod cli;

/// Provider credential loading.
pub mod credentials;

/// Environment constants and well-known paths.
pub mod env;

/// Provider adapters, rate limiting and response selection.
pub mod llm;

/// Batch outreach pipeline.
pub mod outreach;

pub use credentials::Credentials;
pub use llm::{
    BestOfNEvaluator, EvaluationConfig, EvaluationRequest, GenerationDispatcher,
    GenerationRequest, LLMError, ProviderKind, RateLimitConfig, SlidingWindowLimiter,
};
pub use outreach::{BatchReport, OutreachError, OutreachPipeline};

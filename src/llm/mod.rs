pub mod dispatcher;
pub mod evaluator;
pub mod gemini_provider;
pub mod openai_provider;
pub mod provider;
pub mod rate_limiter;
pub mod retry;
pub mod types;


pub use dispatcher::{GenerationDispatcher, ProviderSetup};
pub use evaluator::{BestOfNEvaluator, EvaluationConfig};
pub use gemini_provider::GeminiBackend;
pub use openai_provider::OpenAIBackend;
pub use provider::{CompletionBackend, ProviderAdapter, TextGenerator};
pub use rate_limiter::{RateLimiterStatus, RatePermit, SlidingWindowLimiter};
pub use retry::RetryPolicy;
pub use types::*;

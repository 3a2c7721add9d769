//! Services for edmw-search

pub mod ai_assist;
pub mod batch_orchestrator;
pub mod manufacturer_normalizer;
pub mod pas_client;
pub mod result_classifier;
pub mod search_executor;
pub mod token_provider;

pub use ai_assist::AnthropicAssist;
pub use batch_orchestrator::{
    BatchHandle, BatchOptions, BatchOrchestrator, BatchOutcome, BatchProgress, BatchSummary,
    CompletedRow,
};
pub use manufacturer_normalizer::{ManufacturerNormalizer, NormalizerThresholds};
pub use pas_client::PasClient;
pub use result_classifier::{classify, disambiguate, disambiguate_with_assist};
pub use search_executor::SearchExecutor;
pub use token_provider::{
    AccessToken, OAuthTokenSource, SharedToken, StaticToken, TokenExchange, TokenProvider,
};

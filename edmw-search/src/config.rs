//! Service wiring from configuration for edmw-search
//!
//! Builds the search stack (token provider, PAS client, executor, batch
//! orchestrator) and the optional AI assist from a loaded `TomlConfig`.

use crate::services::{
    AnthropicAssist, BatchOptions, BatchOrchestrator, ManufacturerNormalizer, NormalizerThresholds,
    OAuthTokenSource, PasClient, SearchExecutor, SharedToken,
};
use crate::types::AiAssist;
use edmw_common::config::{TomlConfig, CONFIG_ENV_VAR, PAS_CLIENT_ID_ENV_VAR, PAS_CLIENT_SECRET_ENV_VAR};
use edmw_common::events::EventBus;
use edmw_common::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared token plus the orchestrator that searches with it
pub struct SearchStack {
    pub tokens: Arc<SharedToken>,
    pub orchestrator: BatchOrchestrator,
}

/// Fail with setup guidance when PAS credentials are missing
pub fn require_pas_credentials(config: &TomlConfig) -> Result<()> {
    if config.pas.has_credentials() {
        return Ok(());
    }
    Err(Error::Config(format!(
        "PAS credentials not configured. Please configure using one of:\n\
         1. Environment: {} and {}\n\
         2. TOML config: [pas] client_id / client_secret (path via --config or {})",
        PAS_CLIENT_ID_ENV_VAR, PAS_CLIENT_SECRET_ENV_VAR, CONFIG_ENV_VAR
    )))
}

/// AI assist when enabled and constructible; `None` degrades to fuzzy-only
pub fn build_ai_assist(config: &TomlConfig) -> Option<Arc<dyn AiAssist>> {
    if !config.ai.is_enabled() {
        info!("AI assist not configured, using fuzzy matching only");
        return None;
    }
    match AnthropicAssist::from_config(&config.ai) {
        Ok(assist) => {
            info!(model = %config.ai.model, "AI assist enabled");
            Some(Arc::new(assist) as Arc<dyn AiAssist>)
        }
        Err(e) => {
            warn!(error = %e, "AI assist unavailable, using fuzzy matching only");
            None
        }
    }
}

/// Token provider, PAS client, executor and orchestrator
pub fn build_search_stack(
    config: &TomlConfig,
    assist: Option<Arc<dyn AiAssist>>,
    event_bus: Option<EventBus>,
) -> Result<SearchStack> {
    require_pas_credentials(config)?;

    let exchange = OAuthTokenSource::new(&config.pas).map_err(|e| Error::Config(e.to_string()))?;
    let tokens = Arc::new(SharedToken::new(Arc::new(exchange)));

    let client = PasClient::new(&config.pas, tokens.clone()).map_err(|e| Error::Config(e.to_string()))?;
    let executor = SearchExecutor::new(Arc::new(client))
        .with_unknown_sentinels(config.search.unknown_manufacturer_sentinels.clone());

    let mut orchestrator = BatchOrchestrator::new(executor, BatchOptions::from(&config.search));
    if let Some(assist) = assist {
        orchestrator = orchestrator.with_assist(assist);
    }
    if let Some(bus) = event_bus {
        orchestrator = orchestrator.with_event_bus(bus);
    }

    Ok(SearchStack { tokens, orchestrator })
}

/// Normalizer with configured thresholds
pub fn build_normalizer(config: &TomlConfig, assist: Option<Arc<dyn AiAssist>>) -> ManufacturerNormalizer {
    ManufacturerNormalizer::new(NormalizerThresholds::from(&config.normalizer), assist)
}

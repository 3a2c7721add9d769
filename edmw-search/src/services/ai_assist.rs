//! AI assist client (Anthropic messages API)
//!
//! Asks a model to pick a canonical manufacturer or the best search
//! candidate. Prompts demand a bare JSON object; replies wrapped in
//! markdown fences or surrounded by prose are still accepted.

use crate::error::AssistError;
use crate::models::CandidatePart;
use crate::types::{AiAssist, AssistVerdict, CandidateVerdict};
use async_trait::async_trait;
use edmw_common::config::AiConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic-backed assist
pub struct AnthropicAssist {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicAssist {
    /// Build from config; `Unavailable` when no API key is configured
    pub fn from_config(config: &AiConfig) -> Result<Self, AssistError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AssistError::Unavailable("no API key configured".to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AssistError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: config.api_url.clone(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String, AssistError> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http_client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AssistError::Request(format!("HTTP {}: {}", status.as_u16(), text)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AssistError::Parse(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| AssistError::Parse("response has no text content".to_string()))
    }
}

#[async_trait]
impl AiAssist for AnthropicAssist {
    async fn pick_manufacturer(
        &self,
        subject: &str,
        candidates: &[String],
    ) -> Result<AssistVerdict, AssistError> {
        let text = self.complete(&manufacturer_prompt(subject, candidates)).await?;
        extract_json(&text)
    }

    async fn pick_candidate(
        &self,
        part_number: &str,
        manufacturer: &str,
        description: &str,
        candidates: &[CandidatePart],
    ) -> Result<CandidateVerdict, AssistError> {
        let prompt = candidate_prompt(part_number, manufacturer, description, candidates);
        let text = self.complete(&prompt).await?;
        extract_json(&text)
    }
}

pub(crate) fn manufacturer_prompt(subject: &str, candidates: &[String]) -> String {
    let listed = candidates
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Decide whether this manufacturer name is a variation of one of the canonical names below.

Manufacturer name from the user's data:
{subject}

Canonical manufacturer names (choose ONLY from this list):
{listed}

Rules:
1. Variations include abbreviations, corporate suffixes (Inc, Corp, Ltd), punctuation and spelling differences, and acquisitions (e.g. "EPCOS" is now "TDK Electronics").
2. Only map FROM a variation TO a canonical name, never the reverse.
3. If no canonical name is clearly the same company, answer null.

Return a JSON object:
{{
    "best_match": "<canonical name from the list, or null>",
    "confidence": <0-100>,
    "reasoning": "<brief explanation>"
}}

Only return the JSON, no other text."#
    )
}

pub(crate) fn candidate_prompt(
    part_number: &str,
    manufacturer: &str,
    description: &str,
    candidates: &[CandidatePart],
) -> String {
    let listed = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i, c.match_string()))
        .collect::<Vec<_>>()
        .join("\n");
    let description = if description.trim().is_empty() {
        "Not available"
    } else {
        description
    };

    format!(
        r#"Analyze this electronic component and suggest the best matching part from the search results.

Original part:
- Part Number: {part_number}
- Manufacturer: {manufacturer}
- Description: {description}

Search results (0-based index. part@manufacturer):
{listed}

Instructions:
1. Compare the original part number with each result.
2. Consider manufacturer variations and acquisitions; prefer the current company name.
3. Look for exact or closest part number matches.

Return a JSON object:
{{
    "suggested_index": <0-based index of the best result, or null if none are suitable>,
    "confidence": <0-100>,
    "reasoning": "<brief explanation>"
}}

Only return the JSON, no other text."#
    )
}

/// Parse a JSON object out of a model reply.
///
/// Markdown code fences are stripped first; if the remainder is not valid
/// JSON, the span from the first `{` to the last `}` is tried.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, AssistError> {
    let cleaned = strip_code_fence(text.trim());

    if let Ok(value) = serde_json::from_str(cleaned) {
        return Ok(value);
    }

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&cleaned[start..=end])
            .map_err(|e| AssistError::Parse(format!("{}: {}", e, truncate(cleaned, 200)))),
        _ => Err(AssistError::Parse(format!(
            "no JSON object in response: {}",
            truncate(cleaned, 200)
        ))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = match rest.rfind("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    rest.trim()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

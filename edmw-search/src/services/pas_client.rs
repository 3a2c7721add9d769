//! Part Aggregation Service (PAS) client
//!
//! Parametric search against the remote part catalog, authenticated with a
//! bearer token from the shared `TokenProvider`. Requests are rate limited
//! client-side; result pages are followed until exhausted or `max_matches`
//! candidates are collected.

use crate::error::SearchError;
use crate::models::{CandidatePart, DistributorInfo, QueryMode};
use crate::services::token_provider::TokenProvider;
use crate::types::{PartSearch, SearchRequest};
use async_trait::async_trait;
use edmw_common::config::PasConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Root part class
const PART_CLASS_ID: &str = "76f2225d";

// Catalog property ids
const PROP_MANUFACTURER_NAME: &str = "6230417e";
const PROP_MANUFACTURER_PN: &str = "d8ac8dcc";
const PROP_DATASHEET_URL: &str = "750a45c8";
const PROP_FINDCHIPS_URL: &str = "2a2b1476";
const PROP_LIFECYCLE_STATUS: &str = "e5434e21";
const PROP_LIFECYCLE_CODE: &str = "a189d244";
const PROP_PART_ID: &str = "e1aa6f26";

const PAGE_SIZE_WITH_MANUFACTURER: u32 = 10;
const PAGE_SIZE_PART_NUMBER_ONLY: u32 = 50;

#[derive(Debug, Deserialize)]
struct PasResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<PasErrorBody>,
    #[serde(default)]
    result: Option<PasResultPage>,
}

#[derive(Debug, Deserialize)]
struct PasErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasResultPage {
    #[serde(default)]
    results: Vec<PasResultItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasResultItem {
    #[serde(default)]
    search_provider_part: SearchProviderPart,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchProviderPart {
    #[serde(default)]
    manufacturer_part_number: String,
    #[serde(default)]
    manufacturer_name: String,
    #[serde(default)]
    part_id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    properties: Option<PartProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct PartProperties {
    #[serde(default)]
    succeeded: Map<String, Value>,
}

/// PAS parametric search client
pub struct PasClient {
    http_client: reqwest::Client,
    api_url: String,
    provider_id: u32,
    provider_version: u32,
    max_matches: usize,
    session_id: String,
    tokens: Arc<dyn TokenProvider>,
    rate_limiter: DefaultDirectRateLimiter,
}

impl PasClient {
    pub fn new(config: &PasConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, SearchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::TransportFault(e.to_string()))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            provider_id: config.provider_id,
            provider_version: config.provider_version,
            max_matches: config.max_matches.max(1),
            session_id: format!("session-{}", Uuid::new_v4()),
            tokens,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/api/v2/search-providers/{}/{}/parametric/{}",
            self.api_url, self.provider_id, self.provider_version, action
        )
    }

    /// POST with bearer auth; a 401 drops the token and replays once
    async fn post(&self, url: &str, body: &Value) -> Result<PasResponse, SearchError> {
        let mut replayed = false;

        loop {
            self.rate_limiter.until_ready().await;
            let token = self.tokens.current_token().await?;

            let response = self
                .http_client
                .post(url)
                .bearer_auth(&token.value)
                .header("X-Siemens-Correlation-Id", format!("corr-{}", Uuid::new_v4()))
                .header("X-Siemens-Session-Id", &self.session_id)
                .header("X-Siemens-Ebs-User-Country-Code", "US")
                .header("X-Siemens-Ebs-User-Currency", "USD")
                .json(body)
                .send()
                .await
                .map_err(|e| SearchError::TransportFault(e.to_string()))?;

            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED && !replayed {
                tracing::debug!("PAS returned 401, refreshing token and replaying");
                self.tokens.invalidate().await;
                replayed = true;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(SearchError::TransportFault(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    text
                )));
            }

            let parsed: PasResponse = response
                .json()
                .await
                .map_err(|e| SearchError::TransportFault(format!("Invalid PAS response: {}", e)))?;

            if !parsed.success {
                let message = parsed
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Unknown error".to_string());
                return Err(SearchError::TransportFault(message));
            }

            return Ok(parsed);
        }
    }
}

/// Filter expression for a request
pub fn build_filter(request: &SearchRequest) -> Value {
    let operator = match request.mode {
        QueryMode::Exact => "SmartMatch",
        QueryMode::Partial => "Contains",
    };

    let value_expression = |property_id: &str, term: &str| {
        json!({
            "__valueOperator__": operator,
            "__expression__": "ValueExpression",
            "propertyId": property_id,
            "term": term,
        })
    };

    let part_number = value_expression(PROP_MANUFACTURER_PN, request.part_number.as_str());

    match request.manufacturer.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(manufacturer) => json!({
            "__logicalOperator__": "And",
            "__expression__": "LogicalExpression",
            "left": value_expression(PROP_MANUFACTURER_NAME, manufacturer),
            "right": part_number,
        }),
        None => part_number,
    }
}

/// Full parametric search body
pub fn build_search_body(request: &SearchRequest) -> Value {
    let page_size = if request.manufacturer.as_deref().is_some_and(|m| !m.trim().is_empty()) {
        PAGE_SIZE_WITH_MANUFACTURER
    } else {
        PAGE_SIZE_PART_NUMBER_ONLY
    };

    json!({
        "searchParameters": {
            "partClassId": PART_CLASS_ID,
            "customParameters": {},
            "outputs": [
                PROP_MANUFACTURER_NAME,
                PROP_MANUFACTURER_PN,
                PROP_DATASHEET_URL,
                PROP_FINDCHIPS_URL,
                PROP_LIFECYCLE_STATUS,
                PROP_LIFECYCLE_CODE,
                PROP_PART_ID,
            ],
            "sort": [],
            "paging": { "requestedPageSize": page_size },
            "filter": build_filter(request),
        }
    })
}

/// Property value as text; URL objects carry it under `value`
fn property_text(properties: &Map<String, Value>, id: &str) -> Option<String> {
    let text = match properties.get(id)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => obj.get("value").and_then(Value::as_str)?.to_string(),
        _ => return None,
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn to_candidate(part: SearchProviderPart) -> CandidatePart {
    let properties = part.properties.unwrap_or_default().succeeded;

    let info = DistributorInfo {
        external_id: part.part_id,
        lifecycle_status: property_text(&properties, PROP_LIFECYCLE_STATUS),
        lifecycle_code: property_text(&properties, PROP_LIFECYCLE_CODE),
        datasheet_url: property_text(&properties, PROP_DATASHEET_URL),
        findchips_url: property_text(&properties, PROP_FINDCHIPS_URL),
    };

    CandidatePart::new(part.manufacturer_name.trim(), part.manufacturer_part_number.trim())
        .with_description(part.description.unwrap_or_default())
        .with_distributor_info(info)
}

#[async_trait]
impl PartSearch for PasClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<CandidatePart>, SearchError> {
        if request.part_number.trim().is_empty() {
            return Err(SearchError::InvalidQuery("empty part number".to_string()));
        }

        let mut url = self.endpoint("search");
        let mut body = build_search_body(request);
        let mut candidates: Vec<CandidatePart> = Vec::new();
        let mut pages = 0usize;

        loop {
            let response = self.post(&url, &body).await?;
            pages += 1;

            let Some(page) = response.result else {
                break;
            };
            candidates.extend(
                page.results
                    .into_iter()
                    .map(|item| to_candidate(item.search_provider_part)),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) if candidates.len() < self.max_matches => {
                    url = self.endpoint("get-next-page");
                    body = json!({ "pageToken": token });
                }
                _ => break,
            }
        }

        candidates.truncate(self.max_matches);

        tracing::debug!(
            part_number = %request.part_number,
            manufacturer = ?request.manufacturer,
            mode = ?request.mode,
            pages,
            candidates = candidates.len(),
            "PAS search complete"
        );

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(manufacturer: Option<&str>, mode: QueryMode) -> SearchRequest {
        SearchRequest {
            part_number: "SN74LS04N".to_string(),
            manufacturer: manufacturer.map(str::to_string),
            mode,
        }
    }

    #[test]
    fn test_filter_with_manufacturer_is_and_expression() {
        let filter = build_filter(&request(Some("Texas Instruments"), QueryMode::Exact));
        assert_eq!(filter["__logicalOperator__"], "And");
        assert_eq!(filter["left"]["propertyId"], PROP_MANUFACTURER_NAME);
        assert_eq!(filter["left"]["term"], "Texas Instruments");
        assert_eq!(filter["right"]["propertyId"], PROP_MANUFACTURER_PN);
        assert_eq!(filter["right"]["__valueOperator__"], "SmartMatch");
    }

    #[test]
    fn test_filter_partial_mode_uses_contains() {
        let filter = build_filter(&request(Some("TI"), QueryMode::Partial));
        assert_eq!(filter["left"]["__valueOperator__"], "Contains");
        assert_eq!(filter["right"]["__valueOperator__"], "Contains");
    }

    #[test]
    fn test_part_number_only_body() {
        let body = build_search_body(&request(None, QueryMode::Exact));
        let params = &body["searchParameters"];
        assert_eq!(params["paging"]["requestedPageSize"], 50);
        assert_eq!(params["filter"]["__expression__"], "ValueExpression");
        assert_eq!(params["filter"]["term"], "SN74LS04N");
        assert_eq!(params["partClassId"], PART_CLASS_ID);

        let with_mfg = build_search_body(&request(Some("TI"), QueryMode::Exact));
        assert_eq!(with_mfg["searchParameters"]["paging"]["requestedPageSize"], 10);
    }

    #[test]
    fn test_candidate_extraction() {
        let item: PasResultItem = serde_json::from_value(json!({
            "searchProviderPart": {
                "manufacturerPartNumber": "SN74LS04N",
                "manufacturerName": "Texas Instruments",
                "partId": "abc-123",
                "properties": {
                    "succeeded": {
                        "e5434e21": "Active",
                        "a189d244": 1,
                        "2a2b1476": { "__complex__": "Url", "value": "https://findchips.example/SN74LS04N" },
                        "750a45c8": ""
                    }
                }
            }
        }))
        .unwrap();

        let candidate = to_candidate(item.search_provider_part);
        assert_eq!(candidate.part_number, "SN74LS04N");
        assert_eq!(candidate.manufacturer, "Texas Instruments");

        let info = candidate.distributor_info.unwrap();
        assert_eq!(info.external_id, "abc-123");
        assert_eq!(info.lifecycle_status.as_deref(), Some("Active"));
        assert_eq!(info.lifecycle_code.as_deref(), Some("1"));
        assert_eq!(
            info.findchips_url.as_deref(),
            Some("https://findchips.example/SN74LS04N")
        );
        assert_eq!(info.datasheet_url, None);
    }

    #[test]
    fn test_failure_body_parses() {
        let response: PasResponse = serde_json::from_value(json!({
            "success": false,
            "error": { "message": "Invalid filter" }
        }))
        .unwrap();
        assert!(!response.success);
        assert_eq!(response.error.unwrap().message.as_deref(), Some("Invalid filter"));
    }
}

//! In-memory `PartSearch` double
//!
//! Matching rules:
//! - exact mode: part number equal, manufacturer equal (case-insensitive)
//! - partial mode: part number and manufacturer contained (case-insensitive)
//! - no manufacturer: part number rule only

use async_trait::async_trait;
use edmw_search::models::{CandidatePart, QueryMode};
use edmw_search::{PartSearch, SearchError, SearchRequest};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct MockPartSearch {
    catalog: Vec<CandidatePart>,
    calls: AtomicUsize,
    requests: Mutex<Vec<SearchRequest>>,
    delays: HashMap<String, Duration>,
    /// Query text -> remaining faults
    faults: Mutex<HashMap<String, u32>>,
}

impl MockPartSearch {
    pub fn new(catalog: Vec<CandidatePart>) -> Self {
        Self {
            catalog,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delays: HashMap::new(),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Delay every request whose query text is `part_number`
    pub fn with_delay(mut self, part_number: &str, delay: Duration) -> Self {
        self.delays.insert(part_number.to_string(), delay);
        self
    }

    /// Fail the next `times` requests for `part_number` with a transport fault
    pub fn with_faults(self, part_number: &str, times: u32) -> Self {
        self.faults
            .lock()
            .unwrap()
            .insert(part_number.to_string(), times);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn matches(request: &SearchRequest, candidate: &CandidatePart) -> bool {
        let pn = request.part_number.to_uppercase();
        let candidate_pn = candidate.part_number.to_uppercase();
        let candidate_mfg = candidate.manufacturer.to_uppercase();

        match request.mode {
            QueryMode::Exact => {
                candidate_pn == pn
                    && request
                        .manufacturer
                        .as_ref()
                        .map_or(true, |m| candidate_mfg == m.to_uppercase())
            }
            QueryMode::Partial => {
                candidate_pn.contains(&pn)
                    && request
                        .manufacturer
                        .as_ref()
                        .map_or(true, |m| candidate_mfg.contains(&m.to_uppercase()))
            }
        }
    }
}

#[async_trait]
impl PartSearch for MockPartSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<CandidatePart>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delays.get(&request.part_number) {
            tokio::time::sleep(*delay).await;
        }

        {
            let mut faults = self.faults.lock().unwrap();
            if let Some(remaining) = faults.get_mut(&request.part_number) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SearchError::TransportFault("connection reset".to_string()));
                }
            }
        }

        Ok(self
            .catalog
            .iter()
            .filter(|c| Self::matches(request, c))
            .cloned()
            .collect())
    }
}

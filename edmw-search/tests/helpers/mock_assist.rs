//! Scripted `AiAssist` double

use async_trait::async_trait;
use edmw_search::models::CandidatePart;
use edmw_search::{AiAssist, AssistError, AssistVerdict, CandidateVerdict};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct MockAssist {
    manufacturer_answers: HashMap<String, Result<AssistVerdict, AssistError>>,
    candidate_answer: Option<Result<CandidateVerdict, AssistError>>,
    calls: AtomicUsize,
}

impl MockAssist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `best_match` for `subject`
    pub fn answer(mut self, subject: &str, best_match: Option<&str>, confidence: f64, reasoning: &str) -> Self {
        self.manufacturer_answers.insert(
            subject.to_string(),
            Ok(AssistVerdict {
                best_match: best_match.map(str::to_string),
                confidence,
                reasoning: reasoning.to_string(),
            }),
        );
        self
    }

    /// Fail for `subject`
    pub fn fail(mut self, subject: &str) -> Self {
        self.manufacturer_answers.insert(
            subject.to_string(),
            Err(AssistError::Request("HTTP 529: overloaded".to_string())),
        );
        self
    }

    pub fn pick(mut self, index: Option<usize>, confidence: f64, reasoning: &str) -> Self {
        self.candidate_answer = Some(Ok(CandidateVerdict {
            suggested_index: index,
            confidence,
            reasoning: reasoning.to_string(),
        }));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiAssist for MockAssist {
    async fn pick_manufacturer(
        &self,
        subject: &str,
        _candidates: &[String],
    ) -> Result<AssistVerdict, AssistError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.manufacturer_answers
            .get(subject)
            .cloned()
            .unwrap_or_else(|| Err(AssistError::Unavailable("no scripted answer".to_string())))
    }

    async fn pick_candidate(
        &self,
        _part_number: &str,
        _manufacturer: &str,
        _description: &str,
        _candidates: &[CandidatePart],
    ) -> Result<CandidateVerdict, AssistError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.candidate_answer
            .clone()
            .unwrap_or_else(|| Err(AssistError::Unavailable("no scripted answer".to_string())))
    }
}

//! # EDM Wizard Part Search (edmw-search)
//!
//! Part matching and manufacturer normalization for EDM library imports:
//! - Fallback search (exact → partial → alphanumeric-only → zero-suppressed → part number only)
//! - Result classification and similarity/AI disambiguation
//! - Fuzzy + AI manufacturer normalization against a canonical list
//! - Concurrent, order-preserving, cancellable batch search
//! - PAS parametric search client with OAuth client-credentials tokens

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod tabular;
pub mod types;
pub mod utils;

pub use error::{AssistError, SearchError, TokenError};
pub use types::{AiAssist, AssistVerdict, CandidateVerdict, PartSearch, SearchRequest};

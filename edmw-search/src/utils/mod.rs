//! Utility modules for edmw-search

pub mod part_number;
pub mod similarity;

pub use part_number::{strip_non_alphanumeric, suppress_leading_zeros};
pub use similarity::{candidate_similarity, name_score, rank_names};

//! Test Helper Utilities
//!
//! Shared in-memory doubles for testing edmw-search

#![allow(dead_code)]

pub mod mock_assist;
pub mod mock_search;

// Re-export commonly used items
pub use mock_assist::MockAssist;
pub use mock_search::MockPartSearch;

use edmw_search::models::{CandidatePart, PartRow};

/// Small catalog used across the integration tests
pub fn sample_catalog() -> Vec<CandidatePart> {
    vec![
        CandidatePart::new("Texas Instruments", "SN74LS04N").with_description("Hex inverter"),
        CandidatePart::new("Murata Electronics", "GRM188R71H104KA93D"),
        CandidatePart::new("Murata Electronics", "GRM188R71H104KA01D"),
        CandidatePart::new("Yageo", "RC0603FR-0710KL"),
        CandidatePart::new("Bourns", "123"),
        CandidatePart::new("Vishay Dale", "CRCW060310K0FKEA"),
    ]
}

pub fn row(manufacturer: &str, part_number: &str) -> PartRow {
    PartRow::new(manufacturer, part_number, "")
}

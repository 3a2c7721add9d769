//! Part query, tabular row and candidate part models

use crate::error::SearchError;
use serde::{Deserialize, Deserializer, Serialize};

/// Immutable input to one search: manufacturer (may be empty) + part number.
///
/// Both fields are trimmed on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartQuery {
    manufacturer: String,
    part_number: String,
}

impl PartQuery {
    pub fn new(manufacturer: impl Into<String>, part_number: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into().trim().to_string(),
            part_number: part_number.into().trim().to_string(),
        }
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn part_number(&self) -> &str {
        &self.part_number
    }

    /// True when the manufacturer can constrain a search: non-empty and not
    /// one of the "unknown" sentinels (compared case-insensitively).
    pub fn has_usable_manufacturer(&self, unknown_sentinels: &[String]) -> bool {
        !self.manufacturer.is_empty()
            && !unknown_sentinels
                .iter()
                .any(|s| s.trim().eq_ignore_ascii_case(&self.manufacturer))
    }

    /// Reject queries that cannot be searched at all
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.part_number.is_empty() {
            return Err(SearchError::InvalidQuery(format!(
                "empty part number (manufacturer '{}')",
                self.manufacturer
            )));
        }
        Ok(())
    }
}

/// One record from the tabular data source.
///
/// Accepts the combined-sheet column names (`MFG`, `MFG_PN`, `Description`)
/// as aliases. Nulls and numbers are read as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRow {
    #[serde(default, alias = "MFG", deserialize_with = "text_or_empty")]
    pub manufacturer: String,

    #[serde(default, alias = "MFG_PN", deserialize_with = "text_or_empty")]
    pub part_number: String,

    #[serde(default, alias = "Description", deserialize_with = "text_or_empty")]
    pub description: String,
}

impl PartRow {
    pub fn new(
        manufacturer: impl Into<String>,
        part_number: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            part_number: part_number.into(),
            description: description.into(),
        }
    }

    pub fn to_query(&self) -> PartQuery {
        PartQuery::new(&self.manufacturer, &self.part_number)
    }
}

fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => number_text(&n),
        other => other.to_string(),
    })
}

/// Spreadsheet exports write integer cells as floats (`1234.0`)
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// Supply-chain metadata attached to a candidate by the remote service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorInfo {
    /// Remote part id (data provider id)
    pub external_id: String,
    pub lifecycle_status: Option<String>,
    pub lifecycle_code: Option<String>,
    pub datasheet_url: Option<String>,
    pub findchips_url: Option<String>,
}

/// A part returned by the remote search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePart {
    pub manufacturer: String,
    pub part_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub distributor_info: Option<DistributorInfo>,
}

impl CandidatePart {
    pub fn new(manufacturer: impl Into<String>, part_number: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            part_number: part_number.into(),
            description: String::new(),
            distributor_info: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_distributor_info(mut self, info: DistributorInfo) -> Self {
        self.distributor_info = Some(info);
        self
    }

    /// `PN@Manufacturer` display key used by review screens
    pub fn match_string(&self) -> String {
        format!("{}@{}", self.part_number, self.manufacturer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_trims_fields() {
        let query = PartQuery::new("  Texas Instruments ", " SN74LS04N\t");
        assert_eq!(query.manufacturer(), "Texas Instruments");
        assert_eq!(query.part_number(), "SN74LS04N");
    }

    #[test]
    fn test_unknown_sentinel_is_not_usable() {
        let sentinels = vec!["Unknown".to_string()];
        assert!(!PartQuery::new("", "123").has_usable_manufacturer(&sentinels));
        assert!(!PartQuery::new("unknown", "123").has_usable_manufacturer(&sentinels));
        assert!(PartQuery::new("Murata", "123").has_usable_manufacturer(&sentinels));
    }

    #[test]
    fn test_empty_part_number_is_invalid() {
        let result = PartQuery::new("Murata", "   ").validate();
        assert!(matches!(result, Err(SearchError::InvalidQuery(_))));
        assert!(PartQuery::new("", "GRM188").validate().is_ok());
    }

    #[test]
    fn test_row_accepts_combined_sheet_columns() {
        let row: PartRow = serde_json::from_str(
            r#"{"MFG": " Vishay ", "MFG_PN": 1234, "Description": null}"#,
        )
        .unwrap();
        assert_eq!(row, PartRow::new("Vishay", "1234", ""));
        assert_eq!(row.to_query().part_number(), "1234");
    }

    #[test]
    fn test_row_float_cells_drop_trailing_zero() {
        let row: PartRow = serde_json::from_str(
            r#"{"MFG": "Bourns", "MFG_PN": 1234.0, "Description": 4.7}"#,
        )
        .unwrap();
        assert_eq!(row.part_number, "1234");
        assert_eq!(row.description, "4.7");
    }

    #[test]
    fn test_match_string() {
        let part = CandidatePart::new("Texas Instruments", "SN74LS04N");
        assert_eq!(part.match_string(), "SN74LS04N@Texas Instruments");
    }
}

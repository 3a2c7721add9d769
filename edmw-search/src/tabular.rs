//! Tabular part rows
//!
//! Rows arrive as a JSON array exported from the spreadsheet/database step.
//! Helpers here derive the manufacturer lists the normalizer works on and
//! apply accepted normalizations back onto the rows.

use crate::models::{MatchResult, NormalizationResult, PartRow};
use edmw_common::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Read a JSON array of rows
pub fn load_rows(path: &Path) -> Result<Vec<PartRow>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("Input file not found: {}", path.display()))
        } else {
            Error::Io(e)
        }
    })?;

    let rows: Vec<PartRow> = serde_json::from_str(&text)
        .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;

    tracing::info!(path = %path.display(), rows = rows.len(), "Loaded part rows");
    Ok(rows)
}

/// Distinct non-empty manufacturers, sorted
pub fn unique_manufacturers(rows: &[PartRow]) -> Vec<String> {
    rows.iter()
        .map(|r| r.manufacturer.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Canonical manufacturer names seen in search results, sorted
pub fn reference_manufacturers<'a>(
    results: impl IntoIterator<Item = &'a MatchResult>,
) -> Vec<String> {
    results
        .into_iter()
        .flat_map(|r| r.candidates())
        .map(|c| c.manufacturer.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Read a reference list, one name per line (blank lines and `#` comments
/// ignored)
pub fn load_reference_names(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect())
}

/// Rewrite row manufacturers using the changed normalizations.
///
/// Returns the number of rows rewritten.
pub fn apply_normalizations(rows: &mut [PartRow], results: &[NormalizationResult]) -> usize {
    let mapping: HashMap<&str, &str> = results
        .iter()
        .filter(|r| r.is_change())
        .map(|r| (r.original_name(), r.canonical_name()))
        .collect();

    let mut rewritten = 0;
    for row in rows.iter_mut() {
        if let Some(canonical) = mapping.get(row.manufacturer.trim()) {
            row.manufacturer = (*canonical).to_string();
            rewritten += 1;
        }
    }
    rewritten
}

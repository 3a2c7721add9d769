//! Integration tests for the manufacturer normalizer

mod helpers;

use edmw_search::models::NormalizationSource;
use edmw_search::services::{ManufacturerNormalizer, NormalizerThresholds};
use helpers::MockAssist;
use std::collections::HashMap;
use std::sync::Arc;

fn reference() -> Vec<String> {
    ["Texas Instruments", "Murata", "Panasonic", "TDK"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn with_assist(assist: MockAssist) -> (Arc<MockAssist>, ManufacturerNormalizer) {
    let assist = Arc::new(assist);
    let normalizer = ManufacturerNormalizer::new(NormalizerThresholds::default(), Some(assist.clone()));
    (assist, normalizer)
}

#[tokio::test]
async fn test_low_score_without_assist_is_unchanged() {
    let normalizer = ManufacturerNormalizer::fuzzy_only(NormalizerThresholds::default());

    let result = normalizer.normalize("TI", &reference()).await;

    assert_eq!(result.source(), NormalizationSource::Unchanged);
    assert_eq!(result.canonical_name(), "TI");
    assert!(result.confidence() < 60);
}

#[tokio::test]
async fn test_assist_not_consulted_outside_band() {
    let (assist, normalizer) = with_assist(MockAssist::new());

    let low = normalizer.normalize("TI", &reference()).await;
    let high = normalizer.normalize("Texas Instrument", &reference()).await;

    assert_eq!(low.source(), NormalizationSource::Unchanged);
    assert_eq!(high.source(), NormalizationSource::Fuzzy);
    assert_eq!(assist.calls(), 0);
}

#[tokio::test]
async fn test_ambiguous_band_uses_assist_reasoning() {
    let (assist, normalizer) = with_assist(MockAssist::new().answer(
        "Panasonic Corp",
        Some("Panasonic"),
        95.0,
        "Corporate suffix of Panasonic",
    ));

    let result = normalizer.normalize("Panasonic Corp", &reference()).await;

    assert_eq!(result.source(), NormalizationSource::Ai);
    assert_eq!(result.canonical_name(), "Panasonic");
    assert_eq!(result.confidence(), 95);
    assert_eq!(result.reasoning(), Some("Corporate suffix of Panasonic"));
    assert_eq!(assist.calls(), 1);
}

#[tokio::test]
async fn test_assist_uses_reference_spelling() {
    let (_assist, normalizer) =
        with_assist(MockAssist::new().answer("Panasonic Corp", Some("PANASONIC"), 90.0, "suffix"));

    let result = normalizer.normalize("Panasonic Corp", &reference()).await;

    assert_eq!(result.canonical_name(), "Panasonic");
}

#[tokio::test]
async fn test_assist_no_match_is_unchanged() {
    let (_assist, normalizer) = with_assist(MockAssist::new().answer(
        "Panasonic Corp",
        None,
        20.0,
        "Not the same company",
    ));

    let result = normalizer.normalize("Panasonic Corp", &reference()).await;

    assert_eq!(result.source(), NormalizationSource::Unchanged);
    assert_eq!(result.reasoning(), Some("Not the same company"));
}

#[tokio::test]
async fn test_assist_failure_degrades_to_unchanged() {
    let (assist, normalizer) = with_assist(MockAssist::new().fail("Panasonic Corp"));

    let result = normalizer.normalize("Panasonic Corp", &reference()).await;

    assert_eq!(result.source(), NormalizationSource::Unchanged);
    assert_eq!(result.canonical_name(), "Panasonic Corp");
    assert_eq!(assist.calls(), 1);
}

#[tokio::test]
async fn test_assist_proposal_outside_reference_rejected() {
    let (_assist, normalizer) = with_assist(MockAssist::new().answer(
        "Panasonic Corp",
        Some("Panasonic Corporation"),
        80.0,
        "Full legal name",
    ));

    let result = normalizer.normalize("Panasonic Corp", &reference()).await;

    assert_eq!(result.source(), NormalizationSource::Unchanged);
    assert_eq!(result.canonical_name(), "Panasonic Corp");
}

#[tokio::test]
async fn test_second_pass_is_unchanged() {
    let (_assist, normalizer) = with_assist(MockAssist::new().answer(
        "Panasonic Corp",
        Some("Panasonic"),
        95.0,
        "suffix",
    ));
    let input = names(&["Texas Instrument", "Panasonic Corp", "Murata", "TI"]);

    let first = normalizer.normalize_all(&input, &reference()).await;
    assert_eq!(first.iter().filter(|r| r.is_change()).count(), 2);

    let renamed: Vec<String> = first.iter().map(|r| r.canonical_name().to_string()).collect();
    let second = normalizer.normalize_all(&renamed, &reference()).await;

    for (before, after) in first.iter().zip(second.iter()) {
        if before.is_change() {
            assert_eq!(after.source(), NormalizationSource::Unchanged, "{}", after.original_name());
        }
    }
}

#[tokio::test]
async fn test_canonical_names_never_remapped() {
    // The assist would happily remap a canonical name; it must not be asked
    let (assist, normalizer) = with_assist(
        MockAssist::new()
            .answer("Panasonic", Some("TDK"), 99.0, "wrong")
            .answer("Panasonic Corp", Some("Panasonic"), 95.0, "suffix"),
    );
    let input = names(&["Panasonic", "Panasonic Corp", "Texas Instrument", "Texas Instruments"]);

    let results = normalizer.normalize_all(&input, &reference()).await;

    let by_original: HashMap<&str, &str> = results
        .iter()
        .map(|r| (r.original_name(), r.canonical_name()))
        .collect();
    for result in &results {
        if let Some(mapped) = by_original.get(result.canonical_name()) {
            assert_eq!(
                *mapped,
                result.canonical_name(),
                "canonical '{}' was itself remapped",
                result.canonical_name()
            );
        }
    }
    assert_eq!(by_original["Panasonic"], "Panasonic");
    assert_eq!(assist.calls(), 1);
}

//! Part number variants used by the looser search strategies

/// Remove every character outside `[A-Za-z0-9]` (dashes, slashes, spaces, ...)
pub fn strip_non_alphanumeric(part_number: &str) -> String {
    part_number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Alphanumeric form with leading zeros removed.
///
/// Returns an empty string when nothing but zeros (or punctuation) remains;
/// such a variant is not searchable.
pub fn suppress_leading_zeros(part_number: &str) -> String {
    strip_non_alphanumeric(part_number)
        .trim_start_matches('0')
        .to_string()
}

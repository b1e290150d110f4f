//! Normalized edit-distance similarity between a query and a title.

/// Returns how close `a` and `b` are, in `[0, 1]`, ignoring case.
///
/// Two empty strings are identical (1). An empty string against a non-empty
/// one scores 0. Otherwise the score is
/// `1 - levenshtein(a, b) / max(len(a), len(b))`, with lengths in chars.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }

    let distance = strsim::levenshtein(&a, &b).min(longest);
    // (max - dist) / max keeps fixed points like 9/10 exact.
    ((longest - distance) as f64 / longest as f64).clamp(0.0, 1.0)
}

/// Normalized edit-distance similarity in `[0, 1]`.
///
/// Lengths are counted in chars. Two empty strings score `1.0`. Callers are
/// expected to lowercase both sides first.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count()).max(1);
    let distance = strsim::levenshtein(a, b);
    1.0 - distance as f64 / longest as f64
}

/// Splits on runs of non-word characters (anything outside `[A-Za-z0-9_]`)
/// and drops empty pieces.
pub fn tokenize(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(|character: char| !(character.is_ascii_alphanumeric() || character == '_'))
        .filter(|token| !token.is_empty())
}

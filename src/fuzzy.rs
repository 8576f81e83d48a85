//! Normalized string-similarity ratio — a 0–100 edit-distance-based score.
//!
//! Used both by [`crate::parser::resolve_endpoint`] (decorator-to-label
//! matching) and by the repo-host client (repository-name resolution).

/// Normalized similarity between `a` and `b`, in the range `0..=100`.
///
/// `100` means identical strings; `0` means nothing in common. Backed by
/// `strsim::normalized_levenshtein`, which already returns a `0.0..=1.0`
/// similarity ratio — this just rescales it to an integer percentage.
pub fn ratio(a: &str, b: &str) -> u32 {
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(ratio("/login", "/login"), 100);
    }

    #[test]
    fn empty_strings_score_100() {
        assert_eq!(ratio("", ""), 100);
    }

    #[test]
    fn disjoint_strings_score_low() {
        assert!(ratio("/login", "xyzzy") < 40);
    }

    #[test]
    fn close_strings_score_high() {
        assert!(ratio("/login", "login") > 70);
    }
}

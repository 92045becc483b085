//! Normalized string similarity for fuzzy word matching.

/// Length of the longest common subsequence of two char slices.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // Single rolling row over b
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diag = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diag + 1
            } else {
                above.max(row[j])
            };
            diag = above;
        }
    }
    row[b.len()]
}

/// Case-insensitive similarity ratio in [0, 1].
///
/// Uses the insert/delete edit distance: `2 * lcs / (len(a) + len(b))`.
/// Identical words score 1.0; two empty strings score 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.trim().to_lowercase().chars().collect();
    let b: Vec<char> = b.trim().to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * lcs_len(&a, &b) as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        assert_eq!(similarity("hello", "hello"), 1.0);
        assert_eq!(similarity("Hello", "hELLO"), 1.0);
    }

    #[test]
    fn test_contraction_variants() {
        // "dont" vs "don't": lcs 4, total 9
        let s = similarity("don't", "dont");
        assert!((s - 8.0 / 9.0).abs() < 1e-10);
        assert!(s >= 0.7);
    }

    #[test]
    fn test_disjoint() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_empty() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("word", ""), 0.0);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        for (a, b) in [("kitten", "sitting"), ("its", "it's"), ("a", "an")] {
            let ab = similarity(a, b);
            assert!((ab - similarity(b, a)).abs() < 1e-12);
            assert!((0.0..=1.0).contains(&ab));
        }
    }
}

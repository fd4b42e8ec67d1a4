//! Pluggable text similarity.

use std::collections::HashMap;

/// Scores how alike two texts are, in [0, 1].
pub trait SemanticSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "if", "in", "is", "it", "of",
    "on", "or", "the", "then", "to", "with", "your", "you", "any", "all",
];

/// Lowercased alphanumeric tokens, stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Cosine similarity of term-count vectors. Deterministic, no model needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BagOfWords;

impl SemanticSimilarity for BagOfWords {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let counts = |text: &str| {
            let mut map: HashMap<String, f64> = HashMap::new();
            for token in tokenize(text) {
                *map.entry(token).or_insert(0.0) += 1.0;
            }
            map
        };
        let va = counts(a);
        let vb = counts(b);
        if va.is_empty() || vb.is_empty() {
            return 0.0;
        }

        let dot: f64 = va
            .iter()
            .filter_map(|(t, n)| vb.get(t).map(|m| n * m))
            .sum();
        let norm = |v: &HashMap<String, f64>| v.values().map(|n| n * n).sum::<f64>().sqrt();
        (dot / (norm(&va) * norm(&vb))).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_texts() {
        let s = BagOfWords.similarity("Reseat the RAM modules", "reseat the ram MODULES");
        assert_relative_eq!(s, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_disjoint_texts() {
        assert_eq!(BagOfWords.similarity("replace fan", "update driver"), 0.0);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(BagOfWords.similarity("", "replace fan"), 0.0);
        assert_eq!(BagOfWords.similarity("the and of", "the"), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // {replace, psu} vs {replace, psu, cable}: 2 / (sqrt2 * sqrt3)
        let s = BagOfWords.similarity("Replace the PSU", "replace PSU cable");
        assert_relative_eq!(s, 2.0 / (2f64.sqrt() * 3f64.sqrt()), epsilon = 1e-12);
    }
}

//! Deterministic local embedding
//!
//! Hash-bucket bag of words with position decay. Cosine similarity between
//! two of these vectors loosely tracks lexical overlap; it is a degraded mode
//! and an offline test double, not a semantic model.
//!
//! # Algorithm
//!
//! 1. Lower-case the text, split on whitespace, trim non-alphanumeric edges.
//! 2. Hash each token with a 31-multiplier wrapping 32-bit string hash over
//!    its UTF-16 code units and take `|hash| mod D` as the bucket.
//! 3. Add `weight / sqrt(position + 1)` to the bucket, where `weight` is 2.0
//!    for legal salient terms and 1.0 otherwise.
//! 4. L2-normalize.

use super::{Embedder, Result};
use async_trait::async_trait;

/// Terms boosted 2× by the local embedder
pub const LEGAL_SALIENT_TERMS: &[&str] = &[
    "court", "judge", "defendant", "plaintiff", "motion", "order",
    "statute", "law", "case", "evidence", "witness", "testimony",
    "guilty", "innocent", "verdict", "sentence", "appeal", "custody",
    "divorce", "criminal", "civil", "hearing", "trial", "jury",
    "attorney", "counsel", "prosecution", "defense", "bail",
];

const SALIENT_WEIGHT: f32 = 2.0;

/// Offline hashing embedder
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimension: usize,
}

impl LocalEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        "local-hash"
    }

    /// Embed synchronously; no I/O
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for (position, token) in tokenize(text).enumerate() {
            let bucket = (string_hash(&token).unsigned_abs() as usize) % self.dimension;
            let weight = if LEGAL_SALIENT_TERMS.contains(&token.as_str()) {
                SALIENT_WEIGHT
            } else {
                1.0
            };
            vector[bucket] += weight / ((position + 1) as f32).sqrt();
        }

        let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in &mut vector {
                *v /= magnitude;
            }
        }
        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
}

/// Stable 32-bit string hash (`h = h * 31 + unit`, wrapping)
fn string_hash(token: &str) -> i32 {
    token
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn model_name(&self) -> &str {
        LocalEmbedder::model_name(self)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_string_hash_is_stable() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("ab"), 97 * 31 + 98);
        // wraps instead of overflowing
        let long = "hearing".repeat(20);
        assert_eq!(string_hash(&long), string_hash(&long));
    }

    #[test]
    fn test_vector_is_normalized() {
        let embedder = LocalEmbedder::new(1024);
        let v = embedder.embed_text("The defendant filed a motion to suppress evidence.");
        assert_eq!(v.len(), 1024);
        let norm = dot(&v, &v).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = LocalEmbedder::new(16);
        let v = embedder.embed_text("   \n\t ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_deterministic_and_case_insensitive() {
        let embedder = LocalEmbedder::new(256);
        assert_eq!(
            embedder.embed_text("Hearing, March 15."),
            embedder.embed_text("hearing march 15")
        );
    }

    #[test]
    fn test_shared_terms_score_higher() {
        let embedder = LocalEmbedder::new(1024);
        let doc = embedder.embed_text(
            "The deadline for filing is March 1. The hearing is scheduled for March 15.",
        );
        let related = embedder.embed_text("when is the hearing");
        let unrelated = embedder.embed_text("quarterly revenue projections spreadsheet");
        assert!(dot(&doc, &related) >= 0.3);
        assert!(dot(&doc, &related) > dot(&doc, &unrelated));
    }

    #[test]
    fn test_salient_terms_are_boosted() {
        let embedder = LocalEmbedder::new(1024);
        let v = embedder.embed_text("hearing");
        let w = embedder.embed_text("zebra");
        // single tokens normalize to a unit spike either way
        assert!((dot(&v, &v) - 1.0).abs() < 1e-5);
        assert!((dot(&w, &w) - 1.0).abs() < 1e-5);

        // the boosted term dominates a two-token mix
        let mixed = embedder.embed_text("zebra hearing");
        let hearing_bucket = (string_hash("hearing").unsigned_abs() as usize) % 1024;
        let zebra_bucket = (string_hash("zebra").unsigned_abs() as usize) % 1024;
        assert_ne!(hearing_bucket, zebra_bucket);
        // zebra: 1/sqrt(1) = 1.0, hearing: 2/sqrt(2) ≈ 1.414
        assert!(mixed[hearing_bucket] > mixed[zebra_bucket]);
    }
}

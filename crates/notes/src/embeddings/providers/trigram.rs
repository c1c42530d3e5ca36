//! Deterministic character-trigram embedder for offline use and tests.

use crate::embeddings::provider::{ensure_non_empty, EmbeddingProvider};
use recall_core::AppResult;
use std::collections::{BTreeMap, HashSet};

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "when", "my", "what", "where", "did", "do", "does",
];

/// Trigram-based embedding provider.
///
/// Words are lowercased, stripped of punctuation and stop words, then
/// hashed by character trigram and whole word into a fixed number of
/// buckets. The result is unit length. Texts sharing vocabulary land
/// close together, which is enough for local retrieval without a model.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        for (word, freq) in word_frequencies(text) {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let dim = bucket(&trigram, 37, self.dimensions);
                embedding[dim] += (freq as f32).sqrt();
            }

            embedding[bucket(&word, 31, self.dimensions)] += freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }
}

/// Word counts for `text`, ignoring stop words and words under three
/// characters. Falls back to every word when filtering leaves nothing so
/// that short non-empty input still produces a non-zero vector.
fn word_frequencies(text: &str) -> BTreeMap<String, usize> {
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();

    let mut freq = BTreeMap::new();
    for word in words
        .iter()
        .filter(|w| !stop_words.contains(w.as_str()) && w.chars().count() > 2)
    {
        *freq.entry(word.clone()).or_insert(0) += 1;
    }

    if freq.is_empty() {
        for word in words {
            *freq.entry(word).or_insert(0) += 1;
        }
    }
    freq
}

fn bucket(token: &str, multiplier: u64, dimensions: usize) -> usize {
    let hash = token
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(u64::from(b)));
    (hash % dimensions as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        ensure_non_empty(texts)?;
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic_and_normalized() {
        let provider = TrigramProvider::new(384);
        let a = provider.embed("Dentist appointment Friday 3pm").await.unwrap();
        let b = provider.embed("Dentist appointment Friday 3pm").await.unwrap();

        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = TrigramProvider::new(384);
        let note = provider.embed("Dentist appointment Friday 3pm").await.unwrap();
        let related = provider.embed("when is my dentist appointment?").await.unwrap();
        let unrelated = provider.embed("Buy oat milk and eggs").await.unwrap();

        assert!(cosine(&note, &related) > cosine(&note, &unrelated));
        assert!(cosine(&note, &related) > 0.0);
    }

    #[tokio::test]
    async fn test_rejects_empty_text() {
        let provider = TrigramProvider::new(16);
        assert!(provider.embed("   ").await.is_err());
        assert!(provider
            .embed_batch(&["ok".to_string(), String::new()])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_stop_words_only_still_non_zero() {
        let provider = TrigramProvider::new(64);
        let v = provider.embed("it is").await.unwrap();
        assert!(v.iter().any(|x| *x != 0.0));
    }
}

//! The boundary to the external skip-gram trainer.
//!
//! Training is not done here: an [`EmbeddingTrainer`] receives the corpus as string
//! sentences and returns one fixed-size vector per token.

use crate::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Hyperparameters forwarded to the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkipGramParams {
    pub dimensions: usize,
    /// Context window (each side).
    pub window_size: usize,
    /// Tokens rarer than this are dropped by the trainer; 0 keeps every node.
    pub min_count: usize,
    pub epochs: usize,
    pub seed: u64,
    pub workers: usize,
}

impl Default for SkipGramParams {
    fn default() -> Self {
        Self { dimensions: 128, window_size: 10, min_count: 0, epochs: 1, seed: 1, workers: 8 }
    }
}

/// A sequence-embedding trainer (word2vec-style skip-gram).
pub trait EmbeddingTrainer {
    type Error: std::error::Error + Send + Sync + 'static;

    fn train(
        &mut self,
        sentences: &[Vec<String>],
        params: &SkipGramParams,
    ) -> std::result::Result<Embeddings, Self::Error>;
}

/// Token -> vector map; every vector has the same dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embeddings {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl Embeddings {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, vectors: HashMap::new() }
    }

    pub fn insert(&mut self, token: impl Into<String>, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch { expected: self.dimensions, got: vector.len() });
        }
        self.vectors.insert(token.into(), vector);
        Ok(())
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.vectors.get(token).map(Vec::as_slice)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.vectors.contains_key(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.vectors.keys().map(String::as_str)
    }

    /// The `k` tokens closest to `token` by cosine similarity, best first.
    ///
    /// Ties are broken by token so the result does not depend on map order. Tokens with a
    /// zero vector are skipped.
    pub fn most_similar(&self, token: &str, k: usize) -> Result<Vec<(&str, f64)>> {
        let query = self
            .get(token)
            .ok_or_else(|| Error::UnknownToken(token.to_string()))?;
        let query_norm = norm(query);
        if k == 0 || query_norm == 0.0 {
            return Ok(Vec::new());
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (other, v) in &self.vectors {
            if other == token {
                continue;
            }
            let other_norm = norm(v);
            if other_norm == 0.0 {
                continue;
            }
            let Ok(score) = NotNan::new(dot(query, v) / (query_norm * other_norm)) else {
                continue;
            };
            let entry = Reverse((score, Reverse(other.as_str())));
            if heap.len() < k {
                heap.push(entry);
            } else if let Some(min) = heap.peek() {
                if entry < *min {
                    heap.pop();
                    heap.push(entry);
                }
            }
        }

        let mut ranked: Vec<(NotNan<f64>, &str)> = heap
            .into_iter()
            .map(|Reverse((s, Reverse(t)))| (s, t))
            .collect();
        ranked.sort_unstable_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        Ok(ranked.into_iter().map(|(s, t)| (t, s.into_inner())).collect())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| x as f64 * y as f64).sum()
}

fn norm(a: &[f32]) -> f64 {
    dot(a, a).sqrt()
}

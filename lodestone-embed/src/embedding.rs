//! The embedding value type and the similarity math shared by every store.

use half::f16;
use serde::{Deserialize, Serialize};

/// A dense vector representation of a piece of text.
///
/// Values are kept in half precision, which is also the on-disk format used by
/// the SQLite store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f16>,
}

impl Embedding {
    pub fn new(vector: Vec<f16>) -> Self {
        Self { vector }
    }

    /// Build an embedding from single-precision values.
    pub fn from_f32(values: &[f32]) -> Self {
        Self {
            vector: values.iter().copied().map(f16::from_f32).collect(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.vector.iter().map(|x| x.to_f32()).collect()
    }

    /// Scale the vector to unit length. A zero vector is left untouched.
    pub fn normalize(&mut self) {
        let norm = self
            .vector
            .iter()
            .map(|x| x.to_f32() * x.to_f32())
            .sum::<f32>()
            .sqrt();
        if norm > 0.0 {
            for value in &mut self.vector {
                *value = f16::from_f32(value.to_f32() / norm);
            }
        }
    }

    /// Cosine similarity against another embedding.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        cosine_similarity(&self.vector, &other.vector)
    }
}

impl From<Vec<f16>> for Embedding {
    fn from(vector: Vec<f16>) -> Self {
        Self::new(vector)
    }
}

/// Cosine similarity between two f16 vectors, accumulated in f32.
///
/// Returns 0 when the lengths differ or either vector has zero norm.
pub fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x.to_f32() * y.to_f32())
        .sum();

    let norm_a: f32 = a.iter().map(|x| x.to_f32().powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x.to_f32().powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Map a cosine similarity in `[-1, 1]` onto a relevance score in `[0, 1]`.
pub fn relevance_score(cosine: f32) -> f64 {
    ((f64::from(cosine) + 1.0) / 2.0).clamp(0.0, 1.0)
}

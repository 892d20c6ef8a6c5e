//! Per-observation, per-model embedding rows (spec §3) and the cosine
//! similarity scoring used by vector search.

use serde::{Deserialize, Serialize};

/// An embedding vector attached to one observation under one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub observation_id: i64,
    pub model: String,
    pub dimension: usize,
    /// L2-normalized if the backing store uses cosine similarity.
    pub vector: Vec<f32>,
    #[serde(default)]
    pub lang: Option<String>,
    /// Checksum of the vector bytes, for corruption detection.
    pub checksum: u32,
}

impl Embedding {
    /// Construct an embedding, computing its checksum and validating that
    /// the vector length matches the declared dimension.
    pub fn new(
        observation_id: i64,
        model: impl Into<String>,
        vector: Vec<f32>,
        lang: Option<String>,
    ) -> crate::error::Result<Self> {
        let dimension = vector.len();
        let checksum = checksum_f32(&vector);
        Ok(Self {
            observation_id,
            model: model.into(),
            dimension,
            vector,
            lang,
            checksum,
        })
    }
}

/// A simple additive checksum over the vector's byte representation, used
/// only to detect gross corruption — not cryptographic.
#[must_use]
pub fn checksum_f32(vector: &[f32]) -> u32 {
    vector
        .iter()
        .fold(0u32, |acc, v| acc.wrapping_add(v.to_bits()))
}

/// Cosine similarity between two equal-length vectors, in `[-1.0, 1.0]`.
/// Mismatched lengths or zero-magnitude vectors yield `0.0` rather than
/// panicking, since a corpus can contain embeddings from more than one
/// model dimension that should simply never match each other.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Serialize a vector of `f32` to a little-endian byte blob for storage.
#[must_use]
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Deserialize a little-endian byte blob back into a vector of `f32`.
/// Returns an empty vector if `bytes.len()` is not a multiple of 4.
#[must_use]
pub fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    if bytes.len() % 4 != 0 {
        return Vec::new();
    }
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or([0; 4]);
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0_f32, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        let a = vec![1.0_f32, 0.0];
        let b = vec![0.0_f32, 1.0];
        assert!((cosine_similarity(&a, &b)).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_have_similarity_negative_one() {
        let a = vec![1.0_f32, 2.0, 3.0];
        let b = vec![-1.0_f32, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_dimensions_yield_zero() {
        let a = vec![1.0_f32, 2.0];
        let b = vec![1.0_f32, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn vector_byte_round_trip() {
        let v = vec![0.5_f32, -1.25, 3.0, f32::MIN_POSITIVE];
        let bytes = vector_to_bytes(&v);
        let back = bytes_to_vector(&bytes);
        assert_eq!(v, back);
    }
}

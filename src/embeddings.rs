//! Dependency-free text embeddings for the file store's ranked search.
//!
//! Each character adds a weight that decays with its position to the bucket
//! picked by its code point, so early characters dominate and texts sharing
//! their opening words land close together. Crude, but stable and cheap
//! enough to embed every note per query.

/// Number of buckets per embedding.
pub const DIMENSIONS: usize = 128;

/// Embed `text` into a unit-length vector (all zeros for empty text).
pub fn embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIMENSIONS];
    for (i, c) in text.chars().enumerate() {
        v[c as usize % DIMENSIONS] += 1.0 / (i as f32 + 1.0);
    }
    normalize(v)
}

/// Cosine distance in [0, 2] between two unit vectors; 0 means identical
/// direction. A zero vector is at distance 1 from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - dot
}

/// L2-normalize a vector so cosine similarity == dot product.
fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-10 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

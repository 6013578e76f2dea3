//! Vector operations shared by the quality scorer and the grouper.

/// Fixed-length real-valued vector produced by an embedding model.
pub type Embedding = Vec<f32>;

/// Normalizes a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(v: &[f32]) -> Embedding {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Cosine similarity of two vectors, in [-1, 1].
///
/// Divides by both magnitudes rather than assuming unit-length input, so
/// un-normalized vectors still compare correctly. Mismatched lengths and
/// zero vectors compare as 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

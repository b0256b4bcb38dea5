use std::collections::HashMap;

/// Sparse term-weight vector; an absent term has weight zero.
pub type SparseVector = HashMap<String, f32>;

/// Euclidean norm of a sparse vector. Zero exactly when the vector is empty.
pub fn norm(vec: &SparseVector) -> f32 {
    vec.values().map(|w| w * w).sum::<f32>().sqrt()
}

/// Dot product over the terms present in both vectors.
pub fn dot(a: &SparseVector, b: &SparseVector) -> f32 {
    // iterate the smaller side
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum()
}

/// Cosine similarity between two vectors with precomputed norms.
/// Defined as zero when either norm is zero.
pub fn cosine(a: &SparseVector, a_norm: f32, b: &SparseVector, b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    dot(a, b) / (a_norm * b_norm)
}

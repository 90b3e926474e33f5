//! Embedding helpers shared by goal similarity, cluster tightness and
//! semantic link discovery.

/// Dense embedding vector.
pub type Embedding = Vec<f32>;

/// Cosine similarity in `[-1, 1]`.
///
/// Returns 0.0 for empty inputs, mismatched dimensions, or a zero-magnitude
/// vector so callers never see NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON || !denom.is_finite() {
        return 0.0;
    }
    ((dot / denom) as f32).clamp(-1.0, 1.0)
}

/// Weighted mean of embeddings.
///
/// Entries with non-positive weight, empty vectors, or a dimension different
/// from the first usable entry are skipped. `None` when nothing is usable.
pub fn weighted_centroid<'a, I>(items: I) -> Option<Embedding>
where
    I: IntoIterator<Item = (&'a [f32], f64)>,
{
    let mut sum: Vec<f64> = Vec::new();
    let mut total_weight = 0.0;

    for (embedding, weight) in items {
        if embedding.is_empty() || !(weight > 0.0) || !weight.is_finite() {
            continue;
        }
        if sum.is_empty() {
            sum = vec![0.0; embedding.len()];
        } else if sum.len() != embedding.len() {
            continue;
        }
        for (acc, v) in sum.iter_mut().zip(embedding) {
            *acc += *v as f64 * weight;
        }
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return None;
    }
    Some(sum.into_iter().map(|v| (v / total_weight) as f32).collect())
}

//! Scoring functions for KB matches

use std::collections::HashSet;

/// Lower-cased alphanumeric tokens; everything else separates tokens
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// Share of the entry's tokens that also appear in the query
pub fn overlap_score(query_tokens: &HashSet<String>, entry_tokens: &HashSet<String>) -> f32 {
    if entry_tokens.is_empty() {
        return 0.0;
    }
    let overlap = entry_tokens.intersection(query_tokens).count();
    overlap as f32 / entry_tokens.len() as f32
}

/// Cosine similarity, accumulated in f64.
/// Zero-norm or non-finite inputs score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as f64, y as f64))
        .fold((0.0f64, 0.0f64, 0.0f64), |(d, aa, bb), (x, y)| {
            (d + x * y, aa + x * x, bb + y * y)
        });

    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let sim = dot / (na.sqrt() * nb.sqrt());
    if sim.is_finite() {
        sim as f32
    } else {
        0.0
    }
}

pub fn round3(x: f32) -> f32 {
    (x * 1000.0).round() / 1000.0
}

/// Sort `(score, item)` pairs descending and keep the first `top_n`.
/// The sort is stable, so equal scores keep their input order. NaN ranks last.
pub fn rank_top_n<T>(mut scored: Vec<(f32, T)>, top_n: usize) -> Vec<(f32, T)> {
    let key = |s: f32| match s {
        s if s.is_nan() => f32::NEG_INFINITY,
        s if s == 0.0 => 0.0,
        s => s,
    };
    scored.sort_by(|a, b| key(b.0).total_cmp(&key(a.0)));
    scored.truncate(top_n);
    scored
}

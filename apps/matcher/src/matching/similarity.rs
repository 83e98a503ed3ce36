//! Vector similarity primitives shared by both matching stages.

use crate::errors::MatchError;
use crate::models::Embedding;

/// Fails with `DimensionMismatch` unless both lengths agree.
pub fn ensure_same_dimension(expected: usize, actual: usize) -> Result<(), MatchError> {
    if expected != actual {
        return Err(MatchError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Raw cosine in [-1, 1]; 0.0 when either vector has zero norm.
pub fn raw_cosine(a: &[f32], b: &[f32]) -> Result<f64, MatchError> {
    ensure_same_dimension(a.len(), b.len())?;

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Normalised cosine similarity: `clamp((cos + 1) / 2, 0, 1)`.
///
/// Zero-norm input yields 0.0, not 0.5: an empty vector is similar to nothing.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, MatchError> {
    ensure_same_dimension(a.len(), b.len())?;

    let zero = |v: &[f32]| v.iter().all(|x| *x == 0.0);
    if zero(a) || zero(b) {
        return Ok(0.0);
    }
    let cos = raw_cosine(a, b)?;
    Ok(clamp_similarity((cos + 1.0) / 2.0))
}

/// Clamps a similarity into [0, 1]. NaN and infinities map to 0.0.
pub fn clamp_similarity(similarity: f64) -> f64 {
    if !similarity.is_finite() {
        return 0.0;
    }
    similarity.clamp(0.0, 1.0)
}

/// Converts a cosine distance `d ∈ [0, 2]` into a similarity in [0, 1].
///
/// pgvector reports NaN distance for a zero vector; that scores 0.0.
pub fn similarity_from_distance(distance: f64) -> f64 {
    if !distance.is_finite() {
        return 0.0;
    }
    clamp_similarity(1.0 - distance / 2.0)
}

/// `v / ||v||`, or the zero vector when `||v|| = 0`.
pub fn l2_normalize(vector: &[f32]) -> Embedding {
    let norm = vector
        .iter()
        .map(|x| (*x as f64) * (*x as f64))
        .sum::<f64>()
        .sqrt();

    if norm == 0.0 {
        return vec![0.0; vector.len()];
    }
    vector.iter().map(|x| (*x as f64 / norm) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors_score_one() {
        let a = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_opposite_vectors_score_zero() {
        let a = [0.3_f32, -1.2, 4.0];
        let neg: Vec<f32> = a.iter().map(|x| -x).collect();
        assert!(cosine_similarity(&a, &neg).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_vectors_score_half() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!((sim - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert_eq!(raw_cosine(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_similarity_always_in_unit_interval() {
        let vectors: [[f32; 3]; 5] = [
            [1.0, 2.0, 3.0],
            [-5.0, 0.1, 2.2],
            [1e-6, -1e-6, 0.0],
            [100.0, -100.0, 50.0],
            [0.0, 0.0, -7.0],
        ];
        for a in &vectors {
            for b in &vectors {
                let sim = cosine_similarity(a, b).unwrap();
                assert!((0.0..=1.0).contains(&sim), "sim out of range: {sim}");
            }
        }
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            MatchError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_distance_conversion_clamps() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert_eq!(similarity_from_distance(1.0), 0.5);
        assert_eq!(similarity_from_distance(2.0), 0.0);
        assert_eq!(similarity_from_distance(2.5), 0.0);
        assert_eq!(similarity_from_distance(-0.1), 1.0);
    }

    #[test]
    fn test_non_finite_distance_scores_zero() {
        for distance in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let sim = similarity_from_distance(distance);
            assert_eq!(sim, 0.0, "distance {distance} gave {sim}");
        }
    }

    #[test]
    fn test_clamp_similarity_sanitises() {
        assert_eq!(clamp_similarity(f64::NAN), 0.0);
        assert_eq!(clamp_similarity(1.7), 1.0);
        assert_eq!(clamp_similarity(-0.2), 0.0);
        assert_eq!(clamp_similarity(0.42), 0.42);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = l2_normalize(&[3.0, 4.0]);
        let twice = l2_normalize(&once);
        assert!((once[0] - 0.6).abs() < 1e-6);
        assert!((once[1] - 0.8).abs() < 1e-6);
        for (a, b) in once.iter().zip(&twice) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalize_zero_vector_stays_zero() {
        assert_eq!(l2_normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }
}

/// Cosine similarity of two vectors, clamped to `[-1, 1]`.
///
/// Mismatched lengths, empty input, or a zero vector score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        (dot / (mag_a * mag_b)).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_identical_orthogonal_opposite() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let dim = rng.gen_range(1..64);
            let a: Vec<f32> = (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let b: Vec<f32> = (0..dim).map(|_| rng.gen_range(-10.0..10.0)).collect();

            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            assert_eq!(ab, ba);
            assert!((-1.0..=1.0).contains(&ab));
        }
    }
}

//! Synthetic "normal traffic" training set
//!
//! Used when no persisted model exists. Column order follows
//! `FEATURE_LAYOUT`.

use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};

use crate::logic::features::FEATURE_COUNT;
use super::scorer::ScorerError;

const MEAN_PACKETS: f64 = 5.0;
const MEAN_BYTES: f64 = 500.0;
const STD_BYTES: f64 = 200.0;
const MEAN_RATE: f64 = 1.0;
const STD_RATE: f64 = 0.5;
const MIN_RATE: f64 = 0.01;
/// Port count is drawn from `1..MAX_PORTS_EXCLUSIVE`
const MAX_PORTS_EXCLUSIVE: u32 = 4;

/// Draw `rows` baseline flows:
/// count ~ Poisson(5), bytes ~ N(500, 200) clipped at 1,
/// rate ~ N(1, 0.5) clipped at 0.01, avg size = bytes / max(count, 1),
/// ports ~ U{1, 2, 3}
pub fn synthesize<R: Rng + ?Sized>(rng: &mut R, rows: usize) -> Result<Array2<f64>, ScorerError> {
    let counts = Poisson::new(MEAN_PACKETS)
        .map_err(|e| ScorerError::InvalidParams(e.to_string()))?;
    let bytes = Normal::new(MEAN_BYTES, STD_BYTES)
        .map_err(|e| ScorerError::InvalidParams(e.to_string()))?;
    let rates = Normal::new(MEAN_RATE, STD_RATE)
        .map_err(|e| ScorerError::InvalidParams(e.to_string()))?;

    let mut data = Vec::with_capacity(rows * FEATURE_COUNT);
    for _ in 0..rows {
        let count: f64 = counts.sample(rng);
        let total_bytes = bytes.sample(rng).max(1.0);
        let rate = rates.sample(rng).max(MIN_RATE);
        let avg_size = total_bytes / count.max(1.0);
        let ports = rng.gen_range(1..MAX_PORTS_EXCLUSIVE) as f64;

        data.extend_from_slice(&[count, total_bytes, rate, avg_size, ports]);
    }

    Array2::from_shape_vec((rows, FEATURE_COUNT), data)
        .map_err(|e| ScorerError::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_shape_and_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let data = synthesize(&mut rng, 200).unwrap();
        assert_eq!(data.dim(), (200, FEATURE_COUNT));

        for row in data.rows() {
            assert!(row[0] >= 0.0 && row[0].fract() == 0.0);
            assert!(row[1] >= 1.0);
            assert!(row[2] >= MIN_RATE);
            assert!((row[3] - row[1] / row[0].max(1.0)).abs() < 1e-9);
            assert!((1.0..=3.0).contains(&row[4]));
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_means_near_targets() {
        let mut rng = StdRng::seed_from_u64(42);
        let data = synthesize(&mut rng, 2000).unwrap();
        let mean_count = data.column(0).mean().unwrap();
        let mean_bytes = data.column(1).mean().unwrap();
        assert!((mean_count - MEAN_PACKETS).abs() < 0.5, "mean count {}", mean_count);
        assert!((mean_bytes - MEAN_BYTES).abs() < 30.0, "mean bytes {}", mean_bytes);
    }

    #[test]
    fn test_zero_rows() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(synthesize(&mut rng, 0).unwrap().nrows(), 0);
    }
}

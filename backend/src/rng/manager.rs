//! Seeded random number generator for one simulation run
//!
//! Wraps `rand`'s `StdRng` and exposes the handful of draws the engine
//! needs (uniform, Bernoulli, Poisson, geometric, sampling without
//! replacement).
//!
//! # Determinism
//!
//! Same seed → same sequence of draws. This is CRITICAL for:
//! - Debugging (reproduce an exact epidemic trajectory)
//! - Testing (verify scenario outcomes)
//! - Research (compare policies under common random numbers)

use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Geometric, Poisson};

/// Deterministic random number generator
///
/// # Example
/// ```
/// use campus_seir_core::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next_f64();
/// assert!((0.0..1.0).contains(&value));
/// let index = rng.range(0, 100); // [0, 100)
/// assert!(index < 100);
/// ```
#[derive(Debug, Clone)]
pub struct RngManager {
    /// Seed this manager was created from
    seed: u64,
    /// Underlying generator
    rng: StdRng,
}

impl RngManager {
    /// Create a new RNG with given seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed this manager was created from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Generate random value in range [min, max)
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: usize, max: usize) -> usize {
        assert!(min < max, "min must be less than max");
        self.rng.random_range(min..max)
    }

    /// Bernoulli trial with success probability `p`
    ///
    /// Probabilities outside [0, 1] are clamped.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        if p <= 0.0 || p.is_nan() {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.rng.random_bool(p)
    }

    /// Poisson draw with mean `lambda`
    ///
    /// Returns 0 for a non-positive or non-finite mean.
    pub fn poisson(&mut self, lambda: f64) -> usize {
        if lambda.is_nan() || lambda <= 0.0 || lambda.is_infinite() {
            return 0;
        }
        match Poisson::new(lambda) {
            Ok(distribution) => {
                let draw: f64 = distribution.sample(&mut self.rng);
                draw as usize
            }
            Err(_) => 0,
        }
    }

    /// Number of daily trials up to and including the first success
    ///
    /// Support starts at 1, so a "days until" draw is never zero.
    /// `p >= 1` always gives 1; a non-positive or NaN `p` never succeeds
    /// and gives `u64::MAX`.
    pub fn geometric(&mut self, p: f64) -> u64 {
        if p >= 1.0 {
            return 1;
        }
        if p.is_nan() || p <= 0.0 {
            return u64::MAX;
        }
        Geometric::new(p)
            .map(|distribution| distribution.sample(&mut self.rng).saturating_add(1))
            .unwrap_or(1)
    }

    /// Draw `amount` distinct positions from `0..length`, uniformly
    ///
    /// `amount` is capped at `length`.
    pub fn sample_indices(&mut self, length: usize, amount: usize) -> Vec<usize> {
        let amount = amount.min(length);
        if amount == 0 {
            return Vec::new();
        }
        index::sample(&mut self.rng, length, amount).into_vec()
    }

    /// Draw `amount` distinct items from `items`, uniformly without replacement
    pub fn choose_distinct<T: Clone>(&mut self, items: &[T], amount: usize) -> Vec<T> {
        self.sample_indices(items.len(), amount)
            .into_iter()
            .map(|i| items[i].clone())
            .collect()
    }

    /// Index drawn with probability proportional to `weights`
    ///
    /// `None` when the weights are empty, negative or all zero.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        WeightedIndex::new(weights)
            .ok()
            .map(|distribution| distribution.sample(&mut self.rng))
    }

    /// Shuffle a slice in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

/// Derive an independent seed for the `index`-th stream of `base`
///
/// Uses the splitmix64 finalizer so neighbouring indices produce
/// unrelated seeds.
pub fn derive_seed(base: u64, index: u64) -> u64 {
    let mut z = base
        .wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

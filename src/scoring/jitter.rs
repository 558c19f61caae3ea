//! Injectable randomness for the scoring engine.
//!
//! Every random draw the engine makes (score jitter, sub-model jitter, the
//! probabilistic reasons and simulated latency) goes through a [`JitterSource`],
//! so a seeded source makes scoring fully reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 1)`.
pub trait JitterSource: Send {
    /// Next uniform draw in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Symmetric draw in `[-magnitude, +magnitude)`
    fn symmetric(&mut self, magnitude: f64) -> f64 {
        (self.next_unit() - 0.5) * 2.0 * magnitude
    }

    /// Coin flip that comes up true with probability `p`
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }

    /// Uniform draw in `[low, high)`
    fn between(&mut self, low: f64, high: f64) -> f64 {
        low + self.next_unit() * (high - low)
    }
}

/// Seedable pseudo-random source
pub struct SeededJitter {
    rng: StdRng,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl JitterSource for SeededJitter {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Always draws the midpoint: zero jitter, every coin flip fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralJitter;

impl JitterSource for NeutralJitter {
    fn next_unit(&mut self) -> f64 {
        0.5
    }
}

impl<J: JitterSource + ?Sized> JitterSource for Box<J> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_jitter_is_zero() {
        let mut jitter = NeutralJitter;
        assert_eq!(jitter.symmetric(0.05), 0.0);
        assert!(!jitter.chance(0.5));
        assert_eq!(jitter.between(80.0, 165.0), 122.5);
    }

    #[test]
    fn test_seeded_jitter_reproducible() {
        let mut a = SeededJitter::new(42);
        let mut b = SeededJitter::new(42);
        for _ in 0..32 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_symmetric_bounds() {
        let mut jitter = SeededJitter::new(7);
        for _ in 0..1000 {
            let j = jitter.symmetric(0.02);
            assert!((-0.02..0.02).contains(&j));
        }
    }
}

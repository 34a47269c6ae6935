//! Randomness sources for fault decisions.

use rand::Rng;

/// Source of the two draws a fault decision needs.
pub trait RandomSource: Send + Sync + 'static {
    /// Uniform value in `[0, 1)`.
    fn unit(&self) -> f64;

    /// Uniform integer in `[min, max]`. Callers guarantee `min <= max`.
    fn latency_ms(&self, min: u64, max: u64) -> u64;
}

/// Draws from the calling thread's generator, so concurrent requests never
/// contend on a shared seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn latency_ms(&self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_ranges() {
        let rng = ThreadRandom;
        for _ in 0..1000 {
            let p = rng.unit();
            assert!((0.0..1.0).contains(&p));

            let ms = rng.latency_ms(10, 20);
            assert!((10..=20).contains(&ms));
        }
        assert_eq!(rng.latency_ms(7, 7), 7);
    }
}

use rand::{RngCore, SeedableRng, rngs::SmallRng};

/// Seeded generator owned by a single skip list.
#[derive(Debug, Clone)]
pub(crate) struct Random {
    rng: SmallRng,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    /// Returns true roughly once every `n` calls.
    ///
    /// # Panics
    ///
    /// If `n` is zero.
    pub fn one_in(&mut self, n: u32) -> bool {
        assert!(n > 0, "one_in: n must be greater than 0");
        self.next_u32() % n == 0
    }

    /// Height in `[1, max_height]`, growing by one with probability
    /// `1 / branching` per step.
    ///
    /// # Panics
    ///
    /// If `max_height` or `branching` is zero.
    pub fn random_height(&mut self, max_height: usize, branching: u32) -> usize {
        assert!(max_height > 0, "random_height: max_height must be greater than 0");
        assert!(branching > 0, "random_height: branching must be greater than 0");
        let mut height = 1;
        while height < max_height && self.one_in(branching) {
            height += 1;
        }
        height
    }
}

#[cfg(test)]
mod tests {
    use super::Random;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Random::new(42);
        let mut b = Random::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_height_bounds() {
        let mut rnd = Random::new(7);
        for _ in 0..100_000 {
            let h = rnd.random_height(12, 4);
            assert!((1..=12).contains(&h));
        }

        let mut rnd = Random::new(7);
        for _ in 0..1000 {
            assert_eq!(rnd.random_height(1, 4), 1);
        }
    }

    #[test]
    #[should_panic(expected = "n must be greater than 0")]
    fn test_one_in_zero() {
        Random::new(1).one_in(0);
    }

    #[test]
    #[should_panic(expected = "max_height must be greater than 0")]
    fn test_zero_max_height() {
        Random::new(1).random_height(0, 4);
    }

    #[test]
    fn test_height_distribution() {
        const N: usize = 200_000;
        let mut rnd = Random::new(0xdeadbeef);
        let mut counts = [0usize; 21];
        for _ in 0..N {
            counts[rnd.random_height(20, 4)] += 1;
        }

        // P(height == 1) = 3/4, P(height >= 2) = 1/4, P(height >= 3) = 1/16
        let h1 = counts[1] as f64 / N as f64;
        let ge2 = counts[2..].iter().sum::<usize>() as f64 / N as f64;
        let ge3 = counts[3..].iter().sum::<usize>() as f64 / N as f64;
        assert!((h1 - 0.75).abs() < 0.01, "h1 = {h1}");
        assert!((ge2 - 0.25).abs() < 0.01, "ge2 = {ge2}");
        assert!((ge3 - 0.0625).abs() < 0.005, "ge3 = {ge3}");
    }
}

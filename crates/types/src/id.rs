//! Tiny random identifier and color generation.
//!
//! IDs are short lowercase base-36 strings derived from 6 random bytes
//! (48 bits of entropy). The random source is owned by an [`IdSource`]
//! rather than process-global state, so callers construct one at startup
//! and tests can inject a fixed seed for deterministic output.
//!
//! Uniqueness is probabilistic: the live ID population is bounded by the
//! store's TTL, which keeps the birthday bound far below practical
//! collision risk, so no check-and-retry against the store is performed.

use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

const TINY_ID_BYTES: usize = 6;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// An owned source of randomness for IDs and colors.
#[derive(Debug, Clone)]
pub struct IdSource {
    rng: StdRng,
}

impl IdSource {
    /// Creates a source seeded from OS entropy.
    pub fn new() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }

    /// Creates a deterministic source from a fixed seed.
    ///
    /// Intended for tests; two sources with the same seed produce the
    /// same sequence of IDs and colors.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Returns a new tiny ID: 6 random bytes rendered as lowercase base-36.
    pub fn tiny_id(&mut self) -> String {
        let mut buf = [0u8; TINY_ID_BYTES];
        self.rng.fill_bytes(&mut buf);

        let mut n = 0u64;
        for byte in buf {
            n = (n << 8) | u64::from(byte);
        }

        base36(n)
    }

    /// Returns a random RGBA color with full alpha.
    ///
    /// Components are drawn in steps of 10 between 50 and 240, matching
    /// the palette used for hook favicons.
    pub fn color(&mut self) -> [u8; 4] {
        [self.component(), self.component(), self.component(), u8::MAX]
    }

    fn component(&mut self) -> u8 {
        self.rng.random_range(5..25u8) * 10
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::new()
    }
}

fn base36(mut n: u64) -> String {
    // 13 digits cover u64::MAX in base 36
    let mut digits = [0u8; 13];
    let mut i = digits.len();

    loop {
        i -= 1;
        digits[i] = ALPHABET[(n % 36) as usize];
        n /= 36;
        if n == 0 {
            break;
        }
    }

    String::from_utf8_lossy(&digits[i..]).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn tiny_id_is_lowercase_base36() {
        let mut ids = IdSource::seeded(1);
        for _ in 0..100 {
            let id = ids.tiny_id();
            assert!(!id.is_empty());
            assert!(id.len() <= 10, "6 bytes never need more than 10 base-36 digits");
            assert!(id.bytes().all(|b| ALPHABET.contains(&b)), "unexpected char in {id}");
        }
    }

    #[test]
    fn seeded_source_is_deterministic() {
        let mut a = IdSource::seeded(42);
        let mut b = IdSource::seeded(42);

        for _ in 0..10 {
            assert_eq!(a.tiny_id(), b.tiny_id());
        }
        assert_eq!(a.color(), b.color());
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = IdSource::seeded(1);
        let mut b = IdSource::seeded(2);
        assert_ne!(a.tiny_id(), b.tiny_id());
    }

    #[test]
    fn ids_do_not_repeat_quickly() {
        let mut ids = IdSource::seeded(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(ids.tiny_id()), "collision within 1000 draws");
        }
    }

    #[test]
    fn color_components_in_palette() {
        let mut ids = IdSource::seeded(3);
        for _ in 0..50 {
            let [r, g, b, a] = ids.color();
            for c in [r, g, b] {
                assert!((50..=240).contains(&c));
                assert_eq!(c % 10, 0);
            }
            assert_eq!(a, 255);
        }
    }

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(u64::MAX), "3w5e11264sgsf");
    }
}

// Permuted-congruential generator with 64-bit LCG state. One of these lives
// in every per-thread Scratch so particle histories stay reproducible for a
// fixed thread-to-particle assignment.

use rand::{RngCore, SeedableRng};

/// LCG multiplier
const PRN_MULT: u64 = 6364136223846793005;
/// LCG additive constant
const PRN_ADD: u64 = 1442695040888963407;
/// Multiplier of the RXS-M-XS output permutation
const PRN_PERM_MULT: u64 = 12605985483714917081;

/// Minimal PCG (RXS-M-XS variant): an LCG advanced in place with an output
/// permutation for quality. State is a single u64, so reseeding per history
/// is free.
///
/// Reference: Melissa E. O'Neill, "PCG: A Family of Simple Fast
/// Space-Efficient Statistically Good Algorithms for Random Number
/// Generation"
#[derive(Clone, Copy, Debug)]
pub struct FastRng {
    state: u64,
}

impl FastRng {
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Random f64 uniform on [0, 1).
    #[inline(always)]
    pub fn random(&mut self) -> f64 {
        // Equivalent to ldexp(next_u64, -64)
        (self.next_u64() as f64) * 5.421010862427522e-20
    }

    /// Reset the stream, e.g. at the start of a new particle history.
    #[inline]
    pub fn reseed(&mut self, seed: u64) {
        self.state = seed;
    }
}

impl SeedableRng for FastRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            state: u64::from_le_bytes(seed),
        }
    }
}

impl RngCore for FastRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        // Advance the LCG, then permute the output
        self.state = PRN_MULT.wrapping_mul(self.state).wrapping_add(PRN_ADD);
        let word =
            ((self.state >> ((self.state >> 59) + 5)) ^ self.state).wrapping_mul(PRN_PERM_MULT);
        (word >> 43) ^ word
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut left = dest;
        while left.len() >= 8 {
            let bytes = self.next_u64().to_le_bytes();
            left[..8].copy_from_slice(&bytes);
            left = &mut left[8..];
        }
        if !left.is_empty() {
            let bytes = self.next_u64().to_le_bytes();
            left.copy_from_slice(&bytes[..left.len()]);
        }
    }

    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

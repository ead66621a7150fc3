//! ## HyperLogLog registers
//! Fixed array of `M = 2^P` registers, each holding the largest rank seen
//! among hashes routed to it.
//!
//! [Original HyperLogLog paper](https://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf)
//!
//! Hashes live in a 32-bit space:
//! - bits 31..(32 - P)  - register index
//! - bits (31 - P)..0   - suffix whose leading zero run defines the rank
//!
//! Next to the registers we keep the number of zero registers and the
//! harmonic sum `sum(2^-M[j])`, updated on every register increase, so
//! `estimate` does not walk the array. Every term of the sum is a dyadic
//! rational with at most 29 fractional bits and there are at most 2^18 of
//! them, so the running `f64` sum is exact.

use std::fmt::{Debug, Formatter};
use std::mem::{size_of, size_of_val};

/// Smallest supported precision
pub(crate) const MIN_PRECISION: u8 = 4;
/// Largest supported precision
pub(crate) const MAX_PRECISION: u8 = 18;
/// Size of the hash space the estimate is defined over
const HASH_SPACE: f64 = 4_294_967_296.0;

#[derive(Clone, PartialEq)]
pub(crate) struct Registers {
    precision: u8,
    /// Number of registers still at zero
    zeros: usize,
    /// Harmonic sum of all registers
    sum: f64,
    ranks: Vec<u8>,
}

impl Registers {
    /// Allocate `2^precision` zeroed registers.
    ///
    /// `precision` must already be validated to be in
    /// [`MIN_PRECISION`]..=[`MAX_PRECISION`].
    pub(crate) fn new(precision: u8) -> Self {
        let m = 1usize << precision;
        Self {
            precision,
            zeros: m,
            sum: m as f64,
            ranks: vec![0u8; m],
        }
    }

    #[inline]
    pub(crate) fn precision(&self) -> u8 {
        self.precision
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.ranks.len()
    }

    #[inline]
    pub(crate) fn ranks(&self) -> &[u8] {
        &self.ranks
    }

    #[inline]
    pub(crate) fn zeros(&self) -> usize {
        self.zeros
    }

    /// Split a 32-bit hash into register index and rank
    #[inline]
    pub(crate) fn decode_hash(&self, hash: u32) -> (usize, u8) {
        let p = u32::from(self.precision);
        let idx = (hash >> (32 - p)) as usize;
        // Remaining bits moved to the top; shifted-in zeros are not counted
        let suffix = hash << p;
        let rank = suffix.leading_zeros().min(32 - p) + 1;
        // rank <= 29 for p >= 4
        (idx, rank as u8)
    }

    /// Insert a 32-bit hash, keeping the maximum rank per register
    #[inline]
    pub(crate) fn insert_hash(&mut self, hash: u32) {
        let (idx, rank) = self.decode_hash(hash);
        self.update_rank(idx, rank);
    }

    /// Raise register `idx` to `new_rank` if that is larger than what it holds
    #[inline]
    pub(crate) fn update_rank(&mut self, idx: usize, new_rank: u8) {
        let old_rank = self.ranks[idx];
        if new_rank > old_rank {
            self.ranks[idx] = new_rank;

            if old_rank == 0 {
                self.zeros -= 1;
            }
            self.sum -= inverse_pow2(old_rank);
            self.sum += inverse_pow2(new_rank);
        }
    }

    /// Merge two register arrays of equal precision by register-wise maximum
    pub(crate) fn merge(&mut self, rhs: &Registers) {
        debug_assert_eq!(self.precision, rhs.precision);
        for (idx, &rhs_rank) in rhs.ranks.iter().enumerate() {
            self.update_rank(idx, rhs_rank);
        }
    }

    /// Raw HyperLogLog estimate `alpha * m^2 / sum(2^-M[j])`
    #[inline]
    pub(crate) fn raw_estimate(&self) -> f64 {
        let m = self.len() as f64;
        alpha(self.len()) * m * m / self.sum
    }

    /// Estimate with small and large range corrections applied
    pub(crate) fn estimate(&self) -> f64 {
        let m = self.len() as f64;
        let raw = self.raw_estimate();

        if raw <= 2.5 * m {
            if self.zeros > 0 {
                return linear_counting(m, self.zeros as f64);
            }
            return raw;
        }

        if raw > HASH_SPACE / 30.0 {
            if raw >= HASH_SPACE {
                // every register saturated, the hash space cannot tell more
                return f64::INFINITY;
            }
            return -HASH_SPACE * (1.0 - raw / HASH_SPACE).ln();
        }

        raw
    }

    /// Memory size of the registers
    pub(crate) fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.ranks.as_slice())
    }
}

impl Debug for Registers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, zeros: {}, estimate: {:.0} }}",
            self.precision,
            self.zeros,
            self.estimate()
        )
    }
}

/// `2^-rank`
#[inline]
fn inverse_pow2(rank: u8) -> f64 {
    1.0 / (1u64 << rank) as f64
}

/// Linear counting estimate for `zeros` empty registers out of `m`
#[inline]
fn linear_counting(m: f64, zeros: f64) -> f64 {
    m * (m / zeros).ln()
}

/// Parameter for bias correction
#[inline]
pub(crate) fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}

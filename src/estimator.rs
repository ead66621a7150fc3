//! Cardinality estimator allows to estimate number of distinct elements
//! in the stream or dataset. It is configured with a target relative error,
//! from which the HyperLogLog precision `P` is derived:
//!
//! `P = ceil(log2((1.04 / error_rate)^2))`, clamped to [4..18], so that the
//! expected relative error `1.04 / sqrt(2^P)` is at most `error_rate`
//! (within the clamp).
//!
//! # Expected error
//! - error_rate = 0.05: P = 9,  1.04 / sqrt(2^9)  = 4.60%
//! - error_rate = 0.02: P = 12, 1.04 / sqrt(2^12) = 1.63%
//! - error_rate = 0.01: P = 14, 1.04 / sqrt(2^14) = 0.81%
//!
//! # Hashing
//! Every item is hashed once with `H` (WyHash by default) and the 64-bit
//! result is folded to its low 32 bits. The top `P` bits of that value pick
//! the register, the remaining `32 - P` bits give the rank.
//!
//! # Memory
//! One byte per register plus a fixed header, independent of the number of
//! items inserted.

use std::fmt::{Debug, Formatter};
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};
use std::mem::size_of;

use wyhash::WyHash;

use crate::error::{Error, Result};
use crate::hyperloglog::{Registers, MAX_PRECISION, MIN_PRECISION};

/// Target relative error used when none is given.
pub const DEFAULT_ERROR_RATE: f64 = 0.01;

/// HyperLogLog estimator of the number of distinct items added.
pub struct CardinalityEstimator<H: Hasher + Default = WyHash> {
    /// Configured target relative error
    error_rate: f64,
    registers: Registers,
    /// Zero-sized build hasher
    build_hasher: BuildHasherDefault<H>,
}

impl<H: Hasher + Default> CardinalityEstimator<H> {
    /// Creates an empty estimator targeting `error_rate` relative error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] unless `0 < error_rate < 1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use seen_sketch::estimator::CardinalityEstimator;
    ///
    /// let mut estimator: CardinalityEstimator = CardinalityEstimator::new(0.01).unwrap();
    /// estimator.add("10.0.0.1");
    /// estimator.add("10.0.0.2");
    /// estimator.add("10.0.0.1");
    /// assert_eq!(estimator.estimate().round(), 2.0);
    /// ```
    pub fn new(error_rate: f64) -> Result<Self> {
        let precision = precision_for_error_rate(error_rate)?;
        tracing::debug!(error_rate, precision, "created cardinality estimator");
        Ok(Self::from_parts(error_rate, precision))
    }

    /// Creates an empty estimator with `2^precision` registers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `precision` is outside [4..18].
    pub fn with_precision(precision: u8) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(Error::invalid_parameter(
                "precision",
                format!("must be in [{MIN_PRECISION}; {MAX_PRECISION}], got {precision}"),
            ));
        }
        Ok(Self::from_parts(expected_error(precision), precision))
    }

    fn from_parts(error_rate: f64, precision: u8) -> Self {
        Self {
            error_rate,
            registers: Registers::new(precision),
            build_hasher: BuildHasherDefault::default(),
        }
    }

    /// Adds a hashable item.
    ///
    /// Adding an item that was already added never changes the estimate.
    #[inline]
    pub fn add<T: Hash + ?Sized>(&mut self, item: &T) {
        let mut hasher = self.build_hasher.build_hasher();
        item.hash(&mut hasher);
        self.add_hash(hasher.finish());
    }

    /// Adds a precomputed 64-bit hash; only its low 32 bits are used.
    #[inline]
    pub fn add_hash(&mut self, hash: u64) {
        self.registers.insert_hash(hash as u32);
    }

    /// Returns the cardinality estimate.
    ///
    /// The raw HyperLogLog estimate is replaced by linear counting for small
    /// cardinalities and by the 32-bit large range correction near the top of
    /// the hash space. An empty estimator returns `0.0`.
    #[inline]
    pub fn estimate(&self) -> f64 {
        self.registers.estimate()
    }

    /// Merges another estimator of the same precision into this one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the precisions differ.
    pub fn merge(&mut self, rhs: &Self) -> Result<()> {
        if self.precision() != rhs.precision() {
            return Err(Error::invalid_parameter(
                "rhs",
                format!(
                    "cannot merge precision {} into precision {}",
                    rhs.precision(),
                    self.precision()
                ),
            ));
        }
        self.registers.merge(&rhs.registers);
        Ok(())
    }

    /// Returns the precision `P`.
    pub fn precision(&self) -> u8 {
        self.registers.precision()
    }

    /// Returns the number of registers `2^P`.
    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    /// Returns the configured target relative error.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Returns the expected relative error `1.04 / sqrt(2^P)`.
    pub fn expected_error(&self) -> f64 {
        expected_error(self.precision())
    }

    /// Returns the registers in index order.
    pub fn registers(&self) -> &[u8] {
        self.registers.ranks()
    }

    /// Returns whether nothing was added yet.
    pub fn is_empty(&self) -> bool {
        self.registers.zeros() == self.registers.len()
    }

    /// Return memory size of `CardinalityEstimator`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() - size_of::<Registers>() + self.registers.size_of()
    }
}

/// Derives the HyperLogLog precision for a target relative error.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] unless `0 < error_rate < 1`.
pub fn precision_for_error_rate(error_rate: f64) -> Result<u8> {
    if !(error_rate > 0.0 && error_rate < 1.0) {
        return Err(Error::invalid_parameter(
            "error_rate",
            format!("must be in (0; 1), got {error_rate}"),
        ));
    }
    let precision = (2.0 * (1.04 / error_rate).log2()).ceil();
    let precision = precision.clamp(f64::from(MIN_PRECISION), f64::from(MAX_PRECISION));
    Ok(precision as u8)
}

#[inline]
fn expected_error(precision: u8) -> f64 {
    1.04 / f64::from(1u32 << precision).sqrt()
}

impl<H: Hasher + Default> Default for CardinalityEstimator<H> {
    fn default() -> Self {
        let precision = precision_for_error_rate(DEFAULT_ERROR_RATE).unwrap_or(MAX_PRECISION);
        Self::from_parts(DEFAULT_ERROR_RATE, precision)
    }
}

impl<H: Hasher + Default> Clone for CardinalityEstimator<H> {
    fn clone(&self) -> Self {
        Self {
            error_rate: self.error_rate,
            registers: self.registers.clone(),
            build_hasher: BuildHasherDefault::default(),
        }
    }
}

impl<H: Hasher + Default> PartialEq for CardinalityEstimator<H> {
    /// Compare registers; the configured error rate is informational
    fn eq(&self, rhs: &Self) -> bool {
        self.registers == rhs.registers
    }
}

impl<H: Hasher + Default> Debug for CardinalityEstimator<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, estimate: {:.0}, size: {} }}",
            self.precision(),
            self.estimate(),
            self.size_of()
        )
    }
}

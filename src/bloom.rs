//! Bloom filter for approximate set membership.
//!
//! The filter is a fixed array of `size` bits plus `num_hashes` independent
//! projections of every item onto that array. Each projection salts the item
//! with its index (`"<item>-<i>"`), digests the salted bytes with SHA-256 and
//! reduces the 256-bit digest modulo `size`. Distinct salts keep the
//! projections independent, so the false positive rate after `n` distinct
//! insertions follows `(1 - e^(-k*n/m))^k`.
//!
//! Bits are only ever set. There is no delete, reset or intersection.

use std::fmt::{Debug, Formatter};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Number of bits used when no size is given.
pub const DEFAULT_SIZE: u64 = 1000;
/// Number of hash projections used when none is given.
pub const DEFAULT_NUM_HASHES: u32 = 3;
/// Largest accepted bit array (~4 GiB of words).
pub const MAX_SIZE: u64 = (1u64 << 35) - 64;

/// A Bloom filter over byte strings.
///
/// - `contains` never returns `false` for an added item.
/// - `contains` may return `true` for an item never added (false positive).
#[derive(Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// Number of addressable bits (m)
    size: u64,
    /// Number of hash projections (k)
    num_hashes: u32,
    /// Count of bits set to 1
    num_bits_set: u64,
    /// Bits packed into `u64` words, `ceil(size / 64)` long
    words: Vec<u64>,
}

impl BloomFilter {
    /// Creates an empty filter with `size` bits and `num_hashes` projections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if either argument is zero or
    /// `size` exceeds [`MAX_SIZE`].
    ///
    /// # Examples
    ///
    /// ```
    /// use seen_sketch::bloom::BloomFilter;
    ///
    /// let mut filter = BloomFilter::new(1000, 3).unwrap();
    /// filter.add("password123");
    /// assert!(filter.contains("password123"));
    /// ```
    pub fn new(size: u64, num_hashes: u32) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_parameter("size", "must be greater than 0"));
        }
        if size > MAX_SIZE {
            return Err(Error::invalid_parameter(
                "size",
                format!("must not exceed {MAX_SIZE}, got {size}"),
            ));
        }
        if num_hashes == 0 {
            return Err(Error::invalid_parameter(
                "num_hashes",
                "must be greater than 0",
            ));
        }

        tracing::debug!(size, num_hashes, "created bloom filter");

        Ok(Self::with_valid_params(size, num_hashes))
    }

    fn with_valid_params(size: u64, num_hashes: u32) -> Self {
        let num_words = usize::try_from(size.div_ceil(64)).unwrap_or(usize::MAX);
        Self {
            size,
            num_hashes,
            num_bits_set: 0,
            words: vec![0u64; num_words],
        }
    }

    /// Adds an item by setting all of its projected bits.
    ///
    /// Adding the same item again leaves the bits unchanged.
    pub fn add<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) {
        let item = item.as_ref();
        for i in 0..self.num_hashes {
            let position = self.position(item, i);
            self.set_bit(position);
        }
    }

    /// Tests whether an item was possibly added.
    ///
    /// `false` means the item was definitely never added. `true` means it
    /// was added, or it is a false positive.
    pub fn contains<T: AsRef<[u8]> + ?Sized>(&self, item: &T) -> bool {
        let item = item.as_ref();
        (0..self.num_hashes).all(|i| self.get_bit(self.position(item, i)))
    }

    /// Returns the bit positions of `item`, one per projection, in projection order.
    pub fn positions<T: AsRef<[u8]> + ?Sized>(&self, item: &T) -> Vec<u64> {
        let item = item.as_ref();
        (0..self.num_hashes)
            .map(|i| self.position(item, i))
            .collect()
    }

    /// Merges an equally configured filter into this one (bitwise OR).
    ///
    /// Afterwards `self` reports every item that either filter reported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the filters differ in size or
    /// number of hashes.
    pub fn union(&mut self, other: &BloomFilter) -> Result<()> {
        if !self.is_compatible(other) {
            return Err(Error::invalid_parameter(
                "other",
                format!(
                    "cannot union a ({}, {}) filter into a ({}, {}) filter",
                    other.size, other.num_hashes, self.size, self.num_hashes
                ),
            ));
        }

        for (word, other_word) in self.words.iter_mut().zip(&other.words) {
            *word |= *other_word;
        }
        self.num_bits_set = self.words.iter().map(|w| u64::from(w.count_ones())).sum();
        Ok(())
    }

    /// Returns whether two filters share size and number of hashes.
    pub fn is_compatible(&self, other: &BloomFilter) -> bool {
        self.size == other.size && self.num_hashes == other.num_hashes
    }

    /// Returns the number of bits in the filter.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the number of hash projections.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Returns the number of bits currently set.
    pub fn bits_used(&self) -> u64 {
        self.num_bits_set
    }

    /// Returns whether no item was ever added.
    pub fn is_empty(&self) -> bool {
        self.num_bits_set == 0
    }

    /// Returns the fraction of bits set.
    pub fn load_factor(&self) -> f64 {
        self.num_bits_set as f64 / self.size as f64
    }

    /// Estimates the current false positive probability as `load^k`, the
    /// chance that `k` independent positions all hit a set bit.
    pub fn estimated_fpp(&self) -> f64 {
        self.load_factor().powf(f64::from(self.num_hashes))
    }

    /// Returns the theoretical false positive probability after `n` distinct
    /// items: `(1 - e^(-k*n/m))^k`.
    pub fn expected_fpp(&self, n: u64) -> f64 {
        let k = f64::from(self.num_hashes);
        let ratio = n as f64 / self.size as f64;
        (1.0 - (-k * ratio).exp()).powf(k)
    }

    /// Computes the `i`-th projection of `item`.
    ///
    /// The SHA-256 digest of `item ++ "-" ++ i` is read as a big-endian
    /// integer and reduced modulo `size` one byte at a time.
    fn position(&self, item: &[u8], i: u32) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(item);
        hasher.update(b"-");
        hasher.update(decimal(i, &mut [0u8; 10]));
        let digest = hasher.finalize();

        let modulus = u128::from(self.size);
        let remainder = digest
            .iter()
            .fold(0u128, |acc, &byte| ((acc << 8) | u128::from(byte)) % modulus);
        // remainder < size, so it fits
        remainder as u64
    }

    fn get_bit(&self, position: u64) -> bool {
        let (word, mask) = Self::locate(position);
        self.words[word] & mask != 0
    }

    fn set_bit(&mut self, position: u64) {
        let (word, mask) = Self::locate(position);
        if self.words[word] & mask == 0 {
            self.words[word] |= mask;
            self.num_bits_set += 1;
        }
    }

    #[inline]
    fn locate(position: u64) -> (usize, u64) {
        ((position / 64) as usize, 1u64 << (position % 64))
    }
}

/// Writes `n` in decimal into the tail of `buf` and returns the digits.
fn decimal(mut n: u32, buf: &mut [u8; 10]) -> &[u8] {
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    &buf[start..]
}

impl Default for BloomFilter {
    fn default() -> Self {
        Self::with_valid_params(DEFAULT_SIZE, DEFAULT_NUM_HASHES)
    }
}

impl Debug for BloomFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("size", &self.size)
            .field("num_hashes", &self.num_hashes)
            .field("bits_used", &self.num_bits_set)
            .finish()
    }
}

//! `seen-sketch` provides two fixed-memory probabilistic structures:
//!
//! - [`BloomFilter`]: approximate set membership with no false negatives,
//!   used to tell whether a password was probably seen before without
//!   storing it.
//! - [`CardinalityEstimator`]: HyperLogLog distinct count with a configurable
//!   relative error, used to count unique IP addresses in large logs.
//!
//! Around them sit a password [`uniqueness`] check, a lazy IP token
//! [`log_source`], and an exact-vs-approximate [`compare`] report.
pub mod bloom;
pub mod compare;
pub mod error;
pub mod estimator;
mod hyperloglog;
pub mod log_source;
pub mod uniqueness;

pub use bloom::BloomFilter;
pub use error::{Error, Result};
pub use estimator::CardinalityEstimator;
pub use uniqueness::{classify, Classification, Status, UniquenessChecker};

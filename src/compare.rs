//! Exact vs. approximate distinct counting over the same token stream.
//!
//! Both methods consume tokens through [`DistinctCount`]; [`Counter`] picks
//! between them without boxing. [`measure`] drains a token stream into a
//! counter and times it, and [`Comparison`] renders two measurements side by
//! side.

use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

use enum_dispatch::enum_dispatch;
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};

use crate::error::Result;
use crate::estimator::CardinalityEstimator;

/// Counting methods supported by the comparison
#[enum_dispatch]
#[derive(Debug)]
pub enum Counter {
    Exact(ExactCounter),
    Approximate(CardinalityEstimator),
}

/// Operations shared by every counting method.
#[enum_dispatch(Counter)]
pub trait DistinctCount {
    fn add(&mut self, token: &str);
    fn count(&self) -> f64;
    fn method(&self) -> &'static str;
}

impl Counter {
    pub fn exact() -> Self {
        Counter::Exact(ExactCounter::default())
    }

    pub fn approximate(error_rate: f64) -> Result<Self> {
        Ok(Counter::Approximate(CardinalityEstimator::new(error_rate)?))
    }
}

/// Exact distinct count backed by a hash set.
#[derive(Debug, Default, Clone)]
pub struct ExactCounter {
    seen: HashSet<String>,
}

impl DistinctCount for ExactCounter {
    fn add(&mut self, token: &str) {
        if !self.seen.contains(token) {
            self.seen.insert(token.to_owned());
        }
    }

    fn count(&self) -> f64 {
        self.seen.len() as f64
    }

    fn method(&self) -> &'static str {
        "Exact Count"
    }
}

impl DistinctCount for CardinalityEstimator {
    fn add(&mut self, token: &str) {
        CardinalityEstimator::add(self, token);
    }

    fn count(&self) -> f64 {
        self.estimate()
    }

    fn method(&self) -> &'static str {
        "HyperLogLog"
    }
}

/// Result of counting one token stream with one method.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize))]
pub struct Measurement {
    pub method: &'static str,
    pub count: f64,
    pub tokens: u64,
    pub elapsed: Duration,
}

/// Feeds every token into `counter` and times the whole pass.
pub fn measure<I, S>(mut counter: Counter, tokens: I) -> Measurement
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let start = Instant::now();
    let mut seen = 0u64;
    for token in tokens {
        counter.add(token.as_ref());
        seen += 1;
    }
    let count = counter.count();
    let elapsed = start.elapsed();

    tracing::debug!(
        method = counter.method(),
        tokens = seen,
        count,
        elapsed = ?elapsed,
        "measured distinct count"
    );

    Measurement {
        method: counter.method(),
        count,
        tokens: seen,
        elapsed,
    }
}

/// Exact and approximate measurements of the same stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize))]
pub struct Comparison {
    pub exact: Measurement,
    pub approximate: Measurement,
}

impl Comparison {
    pub fn new(exact: Measurement, approximate: Measurement) -> Self {
        Self { exact, approximate }
    }

    /// Relative deviation of the approximate count from the exact one.
    ///
    /// Zero when both are zero.
    pub fn relative_error(&self) -> f64 {
        if self.exact.count == 0.0 {
            return if self.approximate.count == 0.0 {
                0.0
            } else {
                f64::INFINITY
            };
        }
        (self.approximate.count - self.exact.count).abs() / self.exact.count
    }

    /// Renders the comparison as a markdown table.
    pub fn to_table(&self) -> String {
        #[derive(Tabled)]
        struct Row {
            #[tabled(rename = "")]
            metric: &'static str,
            #[tabled(rename = "Exact Count")]
            exact: String,
            #[tabled(rename = "HyperLogLog")]
            approximate: String,
        }

        let rows = [
            Row {
                metric: "Unique Elements",
                exact: format!("{:.1}", self.exact.count),
                approximate: format!("{:.1}", self.approximate.count),
            },
            Row {
                metric: "Execution Time (s)",
                exact: format!("{:.3}", self.exact.elapsed.as_secs_f64()),
                approximate: format!("{:.3}", self.approximate.elapsed.as_secs_f64()),
            },
        ];

        let table_config = Settings::default().with(Style::markdown());
        Table::new(rows).with(table_config).to_string()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(n: usize) -> impl Iterator<Item = String> {
        (0..n).map(|i| format!("10.0.{}.{}", i / 256, i % 256))
    }

    #[test]
    fn test_exact_counter() {
        let m = measure(Counter::exact(), ["a", "b", "a", "c", "b"]);
        assert_eq!(m.method, "Exact Count");
        assert_eq!(m.count, 3.0);
        assert_eq!(m.tokens, 5);
    }

    #[test]
    fn test_approximate_counter() {
        let counter = Counter::approximate(0.01).unwrap();
        let m = measure(counter, tokens(2_000).chain(tokens(2_000)));
        assert_eq!(m.method, "HyperLogLog");
        assert_eq!(m.tokens, 4_000);
        assert!((m.count - 2_000.0).abs() / 2_000.0 < 0.03, "count = {}", m.count);
    }

    #[test]
    fn test_invalid_error_rate() {
        assert!(Counter::approximate(0.0).is_err());
    }

    #[test]
    fn test_empty_stream() {
        let exact = measure(Counter::exact(), Vec::<String>::new());
        let approx = measure(Counter::approximate(0.01).unwrap(), Vec::<String>::new());
        let comparison = Comparison::new(exact, approx);
        assert_eq!(comparison.exact.count, 0.0);
        assert_eq!(comparison.approximate.count, 0.0);
        assert_eq!(comparison.relative_error(), 0.0);
    }

    #[test]
    fn test_table() {
        let measurement = |method, count, millis| Measurement {
            method,
            count,
            tokens: 10,
            elapsed: Duration::from_millis(millis),
        };
        let comparison = Comparison::new(
            measurement("Exact Count", 1000.0, 1500),
            measurement("HyperLogLog", 1012.4, 250),
        );

        let table = comparison.to_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Exact Count") && lines[0].contains("HyperLogLog"));
        assert!(lines[2].contains("Unique Elements"));
        assert!(lines[2].contains("1000.0") && lines[2].contains("1012.4"));
        assert!(lines[3].contains("Execution Time (s)"));
        assert!(lines[3].contains("1.500") && lines[3].contains("0.250"));
        assert_eq!(comparison.to_string(), table);
        assert!((comparison.relative_error() - 0.0124).abs() < 1e-9);
    }
}

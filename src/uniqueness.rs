//! Password uniqueness check on top of a [`BloomFilter`].
//!
//! Candidates are classified one at a time, in input order:
//! 1. a missing (non-string) or blank candidate is [`Status::Invalid`] and the
//!    filter is left alone;
//! 2. a candidate the filter reports as present is [`Status::AlreadyUsed`];
//! 3. anything else is added to the filter and is [`Status::Unique`].
//!
//! Because the filter can report false positives, a never-seen password may be
//! classified as already used. It is never the other way round.

use std::collections::HashMap;
use std::fmt;

use crate::bloom::BloomFilter;

/// Outcome of checking one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "with_serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Status {
    Invalid,
    AlreadyUsed,
    Unique,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Invalid => "invalid password",
            Status::AlreadyUsed => "already used",
            Status::Unique => "unique",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns whether a candidate may be checked at all.
///
/// `None` stands for a value that is not a string. Surrounding whitespace is
/// fine as long as something else is left.
pub fn is_valid_password(candidate: Option<&str>) -> bool {
    candidate.is_some_and(|pwd| !pwd.trim().is_empty())
}

/// Classifies candidates against a borrowed filter, adding the unique ones.
#[derive(Debug)]
pub struct UniquenessChecker<'a> {
    filter: &'a mut BloomFilter,
}

impl<'a> UniquenessChecker<'a> {
    pub fn new(filter: &'a mut BloomFilter) -> Self {
        Self { filter }
    }

    /// Classifies a single candidate, adding it to the filter when unique.
    pub fn check(&mut self, candidate: Option<&str>) -> Status {
        let status = match candidate {
            Some(pwd) if is_valid_password(candidate) => {
                if self.filter.contains(pwd) {
                    Status::AlreadyUsed
                } else {
                    self.filter.add(pwd);
                    Status::Unique
                }
            }
            _ => Status::Invalid,
        };
        tracing::trace!(%status, "classified candidate");
        status
    }

    /// Classifies every candidate in order.
    pub fn classify<I, S>(&mut self, candidates: I) -> Classification
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let mut classification = Classification::default();
        for candidate in candidates {
            let candidate: Option<&str> = candidate.as_ref().map(|pwd| pwd.as_ref());
            let status = self.check(candidate);
            classification.record(candidate, status);
        }
        tracing::debug!(
            candidates = classification.outcomes.len(),
            bits_used = self.filter.bits_used(),
            "classified batch"
        );
        classification
    }

    /// Returns the underlying filter.
    pub fn filter(&self) -> &BloomFilter {
        &*self.filter
    }
}

/// Classifies `candidates` against `filter`; see [`UniquenessChecker::classify`].
pub fn classify<I, S>(filter: &mut BloomFilter, candidates: I) -> Classification
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    UniquenessChecker::new(filter).classify(candidates)
}

/// Ordered mapping from candidate to status.
///
/// Keys iterate in first-seen order. When a candidate occurs more than once
/// it keeps its first position and reports its latest status; the
/// per-occurrence results stay available through [`Classification::outcomes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    entries: Vec<(Option<String>, Status)>,
    index: HashMap<Option<String>, usize>,
    outcomes: Vec<Status>,
}

impl Classification {
    fn record(&mut self, candidate: Option<&str>, status: Status) {
        self.outcomes.push(status);

        let key = candidate.map(str::to_owned);
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = status,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, status));
            }
        }
    }

    /// Returns the latest status of a candidate.
    pub fn get(&self, candidate: Option<&str>) -> Option<Status> {
        let key = candidate.map(str::to_owned);
        self.index.get(&key).map(|&pos| self.entries[pos].1)
    }

    /// Iterates over distinct candidates in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, Status)> {
        self.entries
            .iter()
            .map(|(key, status)| (key.as_deref(), *status))
    }

    /// Returns the status of every input candidate, in input order.
    pub fn outcomes(&self) -> &[Status] {
        &self.outcomes
    }

    /// Returns the number of distinct candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts input candidates that ended with `status`.
    pub fn count(&self, status: Status) -> usize {
        self.outcomes.iter().filter(|&&s| s == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn seeded_filter() -> BloomFilter {
        let mut filter = BloomFilter::new(1000, 3).unwrap();
        for pwd in ["password123", "admin123", "qwerty123"] {
            filter.add(pwd);
        }
        filter
    }

    #[test_case(None => false; "not a string")]
    #[test_case(Some("") => false; "empty")]
    #[test_case(Some("   ") => false; "spaces only")]
    #[test_case(Some("\t\n") => false; "tab and newline")]
    #[test_case(Some(" pw ") => true; "padded")]
    #[test_case(Some("pw") => true; "plain")]
    fn test_is_valid_password(candidate: Option<&str>) -> bool {
        is_valid_password(candidate)
    }

    #[test]
    fn test_demo_scenario() {
        let mut filter = seeded_filter();
        let result = classify(
            &mut filter,
            [
                Some("password123"),
                Some("newpassword"),
                Some("admin123"),
                Some("guest"),
                Some(""),
                None,
            ],
        );

        let expected = vec![
            (Some("password123"), Status::AlreadyUsed),
            (Some("newpassword"), Status::Unique),
            (Some("admin123"), Status::AlreadyUsed),
            (Some("guest"), Status::Unique),
            (Some(""), Status::Invalid),
            (None, Status::Invalid),
        ];
        assert_eq!(result.iter().collect::<Vec<_>>(), expected);
        assert!(filter.contains("newpassword"));
        assert!(filter.contains("guest"));
    }

    #[test]
    fn test_invalid_does_not_touch_filter() {
        let mut filter = seeded_filter();
        let before = filter.clone();
        let result = classify(&mut filter, [Some("   "), None, Some("")]);
        assert_eq!(result.count(Status::Invalid), 3);
        assert_eq!(filter, before);
    }

    #[test]
    fn test_already_used_does_not_touch_filter() {
        let mut filter = seeded_filter();
        let before = filter.clone();
        let mut checker = UniquenessChecker::new(&mut filter);
        assert_eq!(checker.check(Some("admin123")), Status::AlreadyUsed);
        assert_eq!(checker.filter(), &before);
    }

    #[test]
    fn test_padded_candidate_is_checked_verbatim() {
        let mut filter = BloomFilter::default();
        let mut checker = UniquenessChecker::new(&mut filter);
        assert_eq!(checker.check(Some(" pw ")), Status::Unique);
        assert!(checker.filter().contains(" pw "));
    }

    #[test]
    fn test_duplicate_in_batch() {
        let mut filter = BloomFilter::default();
        let result = classify(&mut filter, vec![Some("hunter2".to_string()); 2]);

        assert_eq!(result.outcomes(), &[Status::Unique, Status::AlreadyUsed]);
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(Some("hunter2")), Some(Status::AlreadyUsed));
    }

    #[test]
    fn test_get_missing() {
        let mut filter = BloomFilter::default();
        let result = classify(&mut filter, [Some("a")]);
        assert_eq!(result.get(Some("b")), None);
        assert_eq!(result.get(None), None);
        assert!(!result.is_empty());
    }

    #[test_case(Status::Invalid => "invalid password")]
    #[test_case(Status::AlreadyUsed => "already used")]
    #[test_case(Status::Unique => "unique")]
    fn test_status_display(status: Status) -> String {
        status.to_string()
    }

    #[cfg(feature = "with_serde")]
    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&Status::AlreadyUsed).unwrap();
        assert_eq!(json, "\"already_used\"");
        let status: Status = serde_json::from_str("\"unique\"").unwrap();
        assert_eq!(status, Status::Unique);
    }
}

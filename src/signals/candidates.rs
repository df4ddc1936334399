// src/signals/candidates.rs
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// The account numbers detected on a single page.
///
/// Kept as a sorted, deduplicated sequence so that picking "the" account out
/// of several candidates is reproducible. Ordering is [`candidate_order`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CandidateSet(Vec<String>);

impl CandidateSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Inserts a candidate, returning `false` if it was already present.
    pub fn insert(&mut self, candidate: impl Into<String>) -> bool {
        let candidate = candidate.into();
        match self.0.binary_search_by(|existing| candidate_order(existing, &candidate)) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, candidate);
                true
            }
        }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.0
            .binary_search_by(|existing| candidate_order(existing, candidate))
            .is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// True when the set is exactly `{account}`.
    pub fn is_only(&self, account: &str) -> bool {
        self.0.len() == 1 && self.0[0] == account
    }

    /// Candidates other than `current`, smallest first.
    pub fn new_candidates<'a>(&'a self, current: Option<&'a str>) -> impl Iterator<Item = &'a str> {
        self.iter().filter(move |c| Some(*c) != current)
    }
}

impl<S: Into<String>> FromIterator<S> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for candidate in iter {
            set.insert(candidate);
        }
        set
    }
}

impl From<Vec<String>> for CandidateSet {
    fn from(values: Vec<String>) -> Self {
        values.into_iter().collect()
    }
}

impl From<CandidateSet> for Vec<String> {
    fn from(set: CandidateSet) -> Self {
        set.0
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Total order used to break ties between candidates.
///
/// Digit-only strings sort numerically (leading zeros ignored, then raw text
/// as a final tie-break) and come before anything else; other strings sort
/// lexicographically.
pub fn candidate_order(a: &str, b: &str) -> Ordering {
    match (is_numeric(a), is_numeric(b)) {
        (true, true) => {
            let ta = a.trim_start_matches('0');
            let tb = b.trim_start_matches('0');
            ta.len()
                .cmp(&tb.len())
                .then_with(|| ta.cmp(tb))
                .then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_order_beats_lexicographic() {
        let set: CandidateSet = ["1000000", "999999", "0999998"].into_iter().collect();
        assert_eq!(set.as_slice(), &["0999998", "999999", "1000000"]);
    }

    #[test]
    fn test_dedup_and_mixed_order() {
        let mut set = CandidateSet::new();
        assert!(set.insert("ACC-9"));
        assert!(set.insert("123456"));
        assert!(!set.insert("123456"));
        assert_eq!(set.as_slice(), &["123456", "ACC-9"]);
        assert!(set.contains("ACC-9"));
        assert!(!set.contains("ACC-8"));
    }

    #[test]
    fn test_new_candidates_skips_current() {
        let set: CandidateSet = ["222", "111", "333"].into_iter().collect();
        let fresh: Vec<&str> = set.new_candidates(Some("111")).collect();
        assert_eq!(fresh, vec!["222", "333"]);
        assert!(!set.is_only("111"));
        let single: CandidateSet = ["111"].into_iter().collect();
        assert!(single.is_only("111"));
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-width, zero-padded identifier distinguishing one copy from another
///
/// The width is the number of decimal digits in `total_count - 1`, so every
/// identifier of a job has the same length and sorts lexicographically in
/// numeric order. Only [`Identifier::format`] and the adapters' "no suffix"
/// path ([`Identifier::empty`]) create values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    /// Format `index` for a job of `total_count` copies
    ///
    /// Callers keep `index < total_count` and `total_count >= 1`. The engine
    /// only ever passes indices from `0..total_count`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stampede_domain::Identifier;
    ///
    /// assert_eq!(Identifier::format(1000, 7).as_str(), "007");
    /// assert_eq!(Identifier::format(1, 0).as_str(), "0");
    /// ```
    pub fn format(total_count: usize, index: usize) -> Self {
        debug_assert!(index < total_count, "index {index} out of range for {total_count}");
        let width = Self::width(total_count);
        Self(format!("{index:0width$}"))
    }

    /// Number of digits every identifier of a `total_count` job carries
    pub fn width(total_count: usize) -> usize {
        let mut last = total_count.saturating_sub(1);
        let mut digits = 1;
        while last >= 10 {
            last /= 10;
            digits += 1;
        }
        digits
    }

    /// Identifier used when writing the unsuffixed originals
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_width_matches_digits_of_last_index() {
        assert_eq!(Identifier::width(1), 1);
        assert_eq!(Identifier::width(10), 1);
        assert_eq!(Identifier::width(11), 2);
        assert_eq!(Identifier::width(100), 2);
        assert_eq!(Identifier::width(1000), 3);
        assert_eq!(Identifier::width(1001), 4);
        assert_eq!(Identifier::width(2000), 4);
    }

    #[test]
    fn test_format_pads_with_zeros() {
        assert_eq!(Identifier::format(1000, 0).as_str(), "000");
        assert_eq!(Identifier::format(1000, 42).as_str(), "042");
        assert_eq!(Identifier::format(1000, 999).as_str(), "999");
        assert_eq!(Identifier::format(2000, 7).as_str(), "0007");
    }

    #[test]
    fn test_single_copy_has_width_one() {
        assert_eq!(Identifier::format(1, 0).as_str(), "0");
    }

    #[test]
    fn test_length_is_constant_across_job() {
        for total in [1usize, 2, 9, 10, 11, 99, 100, 101, 1000, 1234] {
            let expected = (total - 1).to_string().len();
            for index in 0..total {
                assert_eq!(
                    Identifier::format(total, index).as_str().len(),
                    expected,
                    "total={total} index={index}"
                );
            }
        }
    }

    #[test]
    fn test_identifiers_are_unique_and_sorted() {
        let total = 1500;
        let ids: Vec<Identifier> = (0..total).map(|i| Identifier::format(total, i)).collect();

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), total);

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, ids, "lexicographic order should equal numeric order");
    }

    #[test]
    fn test_identifier_display() {
        let id = Identifier::format(100, 5);
        assert_eq!(format!("{}", id), "05");
        assert!(Identifier::empty().as_str().is_empty());
    }
}

/// Depth Range
///
/// Inclusive integer interval with an explicit empty state, used to
/// summarize the call-stack depths at which a method was observed.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepthRange {
    bounds: Option<(usize, usize)>,
}

impl DepthRange {
    pub const fn empty() -> Self {
        Self { bounds: None }
    }

    pub const fn single(value: usize) -> Self {
        Self { bounds: Some((value, value)) }
    }

    /// Returns `None` when `min > max`.
    pub fn new(min: usize, max: usize) -> Option<Self> {
        (min <= max).then_some(Self { bounds: Some((min, max)) })
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn min(&self) -> Option<usize> {
        self.bounds.map(|(min, _)| min)
    }

    pub fn max(&self) -> Option<usize> {
        self.bounds.map(|(_, max)| max)
    }

    pub fn contains(&self, value: usize) -> bool {
        matches!(self.bounds, Some((min, max)) if min <= value && value <= max)
    }

    /// Widen the interval so it includes `value`.
    /// An empty range collapses to `[value, value]`, both bounds set.
    pub fn extend_to_include(&mut self, value: usize) {
        self.bounds = match self.bounds {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        };
    }

    /// Smallest range covering both `self` and `other`.
    pub fn merge(&self, other: &DepthRange) -> DepthRange {
        match (self.bounds, other.bounds) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((a_min, a_max)), Some((b_min, b_max))) => DepthRange {
                bounds: Some((a_min.min(b_min), a_max.max(b_max))),
            },
        }
    }
}

impl fmt::Display for DepthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bounds {
            None => write!(f, "-"),
            Some((min, max)) if min == max => write!(f, "{}", min),
            Some((min, max)) => write!(f, "{}..{}", min, max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extend_empty_sets_both_bounds() {
        let mut range = DepthRange::empty();
        range.extend_to_include(4);
        assert_eq!(range.min(), Some(4));
        assert_eq!(range.max(), Some(4));
        assert_eq!(range, DepthRange::single(4));
    }

    #[test]
    fn test_extend_widens_only() {
        let mut range = DepthRange::single(3);
        range.extend_to_include(1);
        range.extend_to_include(7);
        range.extend_to_include(5);
        assert_eq!(range, DepthRange::new(1, 7).unwrap());
        assert!(range.contains(5));
        assert!(!range.contains(8));
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        assert!(DepthRange::new(5, 2).is_none());
        assert!(DepthRange::new(2, 2).is_some());
    }

    #[test]
    fn test_merge_with_empty() {
        let a = DepthRange::new(2, 3).unwrap();
        assert_eq!(a.merge(&DepthRange::empty()), a);
        assert_eq!(DepthRange::empty().merge(&a), a);
        assert_eq!(a.merge(&DepthRange::single(9)), DepthRange::new(2, 9).unwrap());
    }

    #[test]
    fn test_display() {
        assert_eq!(DepthRange::empty().to_string(), "-");
        assert_eq!(DepthRange::single(2).to_string(), "2");
        assert_eq!(DepthRange::new(1, 4).unwrap().to_string(), "1..4");
    }

    proptest! {
        #[test]
        fn extended_range_is_hull_of_values(values in prop::collection::vec(0usize..10_000, 1..50)) {
            let mut range = DepthRange::empty();
            for v in &values {
                range.extend_to_include(*v);
            }
            prop_assert_eq!(range.min(), values.iter().copied().min());
            prop_assert_eq!(range.max(), values.iter().copied().max());
            for v in &values {
                prop_assert!(range.contains(*v));
            }
        }
    }
}

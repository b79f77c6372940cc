//! Ordering strategies.
//!
//! Trees take their ordering as an injected value rather than from `Ord`, so the same key type
//! can be indexed under several orders (one per dimension in a
//! [`RangeTree`](crate::RangeTree), reversed order in a plain tree, and so on).

use core::cmp::Ordering;

/// A strict "less than" relation.
///
/// Implementations must be a strict weak ordering. Keys that are neither less nor greater
/// than each other are treated as the same key. A relation that breaks these rules does not
/// corrupt memory but leaves the results of every operation unspecified.
///
/// Any `Fn(&T, &T) -> bool` is a comparator:
///
/// ```
/// use avl_index::AvlTree;
///
/// let mut tree = AvlTree::with_comparator(|a: &i32, b: &i32| a > b);
/// tree.insert(1, "one");
/// tree.insert(5, "five");
/// tree.insert(3, "three");
///
/// let values: Vec<_> = tree.values().copied().collect();
/// assert_eq!(values, ["five", "three", "one"]);
/// ```
pub trait Comparator<T: ?Sized> {
    /// Returns true if `a` orders strictly before `b`.
    fn less(&self, a: &T, b: &T) -> bool;

    /// Three-way comparison derived from [`less`](Comparator::less).
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        if self.less(a, b) {
            Ordering::Less
        } else if self.less(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

impl<T: ?Sized, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

/// The order given by the key's `Ord` implementation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct NaturalOrder;

impl<T: ?Sized + Ord> Comparator<T> for NaturalOrder {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        a < b
    }

    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn closure_comparator_derives_compare() {
        let by_abs = |a: &i32, b: &i32| a.abs() < b.abs();
        assert_eq!(by_abs.compare(&-1, &2), Ordering::Less);
        assert_eq!(by_abs.compare(&-3, &2), Ordering::Greater);
        assert_eq!(by_abs.compare(&-3, &3), Ordering::Equal);
    }

    #[test]
    fn natural_order_matches_ord() {
        assert!(Comparator::<str>::less(&NaturalOrder, "a", "b"));
        assert_eq!(NaturalOrder.compare(&5, &5), Ordering::Equal);
        assert_eq!(NaturalOrder.compare(&6, &5), Ordering::Greater);
    }
}

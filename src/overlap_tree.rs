//! An interval / bounding-box tree for overlap queries.
//!
//! Objects of any type are stored together with an [`Extractor`] that reads their
//! axis-aligned bounding box, one `{min, max}` pair per axis. Every node of the underlying
//! AVL tree is augmented with the bounding box of its whole subtree, so an overlap query
//! skips every subtree whose box misses the query box.

use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;
use tracing::debug;

use crate::avl_tree::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::compare::{Comparator, NaturalOrder};
use crate::error::PositionError;
use crate::position::{Position, TreeId};
use crate::raw::{Handle, RawAvlTree, Summarize};

/// Which end of an object's extent along an axis to extract.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BoundKind {
    Min,
    Max,
}

/// Reads the bounding box of an object, one coordinate at a time.
///
/// `extract(object, kind, axis)` returns the lower or upper bound of `object` along
/// `axis` (counted from 0). Implementations must return `min <= max` on every axis and
/// must not return NaN; other values leave query results unspecified.
///
/// Any `Fn(&T, BoundKind, usize) -> f64` is an extractor.
pub trait Extractor<T: ?Sized> {
    fn extract(&self, object: &T, kind: BoundKind, axis: usize) -> f64;
}

impl<T: ?Sized, F> Extractor<T> for F
where
    F: Fn(&T, BoundKind, usize) -> f64,
{
    #[inline]
    fn extract(&self, object: &T, kind: BoundKind, axis: usize) -> f64 {
        self(object, kind, axis)
    }
}

/// A closed axis-aligned box in `D` dimensions.
///
/// The default box is empty: it overlaps nothing and is the identity of
/// [`union`](Aabb::union).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb<const D: usize> {
    min: [f64; D],
    max: [f64; D],
}

impl<const D: usize> Aabb<D> {
    #[must_use]
    pub const fn new(min: [f64; D], max: [f64; D]) -> Self {
        Aabb { min, max }
    }

    /// The bounding box of `object` as reported by `extractor`.
    pub fn of<T: ?Sized, E: Extractor<T> + ?Sized>(object: &T, extractor: &E) -> Self {
        Aabb {
            min: core::array::from_fn(|axis| extractor.extract(object, BoundKind::Min, axis)),
            max: core::array::from_fn(|axis| extractor.extract(object, BoundKind::Max, axis)),
        }
    }

    #[must_use]
    pub const fn min(&self) -> &[f64; D] {
        &self.min
    }

    #[must_use]
    pub const fn max(&self) -> &[f64; D] {
        &self.max
    }

    /// Returns true if the boxes share at least one point. Touching boxes overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        (0..D).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    /// The smallest box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Aabb {
            min: core::array::from_fn(|axis| self.min[axis].min(other.min[axis])),
            max: core::array::from_fn(|axis| self.max[axis].max(other.max[axis])),
        }
    }
}

impl<const D: usize> Default for Aabb<D> {
    fn default() -> Self {
        Aabb {
            min: [f64::INFINITY; D],
            max: [f64::NEG_INFINITY; D],
        }
    }
}

/// A balanced tree of objects indexed for bounding-box overlap queries.
///
/// Objects are ordered by the lower bound of their box on axis 0; objects whose lower
/// bounds tie are ordered by the tie-break comparator `C`. Two objects that tie under both
/// are the same key, and only the first one inserted is kept.
///
/// # Examples
///
/// ```
/// use avl_index::overlap_tree::{BoundKind, OverlapTree};
///
/// type Segment = ((i32, i32), (i32, i32));
///
/// fn bounds(segment: &Segment, kind: BoundKind, axis: usize) -> f64 {
///     let (a, b) = *segment;
///     let (a, b) = if axis == 0 { (a.0, b.0) } else { (a.1, b.1) };
///     f64::from(match kind {
///         BoundKind::Min => a.min(b),
///         BoundKind::Max => a.max(b),
///     })
/// }
///
/// let mut tree: OverlapTree<2, Segment, _> = OverlapTree::new(bounds);
/// tree.insert_key(((2, 4), (3, 1)));
/// tree.insert_key(((5, 9), (8, 1)));
///
/// let query = ((0, 3), (8, 10));
/// assert!(tree.aabb_overlap_check(&query));
///
/// let mut hits = Vec::new();
/// tree.aabb_overlap_query(&query, &mut hits);
/// assert_eq!(hits.len(), 2);
/// ```
pub struct OverlapTree<const D: usize, T, E, V = (), C = NaturalOrder> {
    raw: RawAvlTree<T, V, Aabb<D>>,
    extractor: E,
    tie_break: C,
}

// Key order of an overlap tree: lower bound on axis 0, then the tie-break comparator.
struct MinBoundOrder<'a, E, C> {
    extractor: &'a E,
    tie_break: &'a C,
}

impl<T, E: Extractor<T>, C: Comparator<T>> Comparator<T> for MinBoundOrder<'_, E, C> {
    fn less(&self, a: &T, b: &T) -> bool {
        let a_min = self.extractor.extract(a, BoundKind::Min, 0);
        let b_min = self.extractor.extract(b, BoundKind::Min, 0);
        match a_min.total_cmp(&b_min) {
            core::cmp::Ordering::Less => true,
            core::cmp::Ordering::Greater => false,
            core::cmp::Ordering::Equal => self.tie_break.less(a, b),
        }
    }
}

// Summarizes a subtree by its bounding box.
struct BoxHook<'a, E> {
    extractor: &'a E,
}

impl<T, V, E: Extractor<T>, const D: usize> Summarize<T, V, Aabb<D>> for BoxHook<'_, E> {
    fn summarize(&mut self, _node: Handle, key: &T, _value: &V, left: Option<&Aabb<D>>, right: Option<&Aabb<D>>) -> Aabb<D> {
        [left, right]
            .into_iter()
            .flatten()
            .fold(Aabb::of(key, self.extractor), |bounds, child| bounds.union(child))
    }
}

impl<const D: usize, T: Ord, E: Extractor<T>, V> OverlapTree<D, T, E, V> {
    /// Makes a new, empty tree that breaks ties with the objects' [`Ord`] implementation.
    #[must_use]
    pub fn new(extractor: E) -> Self {
        OverlapTree::with_tie_break(extractor, NaturalOrder)
    }
}

impl<const D: usize, T, E: Extractor<T>, V, C: Comparator<T>> OverlapTree<D, T, E, V, C> {
    /// Makes a new, empty tree ordering objects with equal lower bounds by `tie_break`.
    #[must_use]
    pub fn with_tie_break(extractor: E, tie_break: C) -> Self {
        OverlapTree::with_capacity(0, extractor, tie_break)
    }

    /// Makes a new, empty tree with room for at least `capacity` objects.
    ///
    /// A tree needs at least one axis; `D == 0` is rejected at compile time.
    #[must_use]
    pub fn with_capacity(capacity: usize, extractor: E, tie_break: C) -> Self {
        const { assert!(D > 0, "an overlap tree needs at least one axis") };
        OverlapTree {
            raw: RawAvlTree::with_capacity(capacity),
            extractor,
            tie_break,
        }
    }

    /// Returns the extractor reading the objects' bounds.
    pub const fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Returns the identity stamped into this tree's positions.
    #[must_use]
    pub const fn id(&self) -> TreeId {
        self.raw.id()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Removes every object. Every outstanding position becomes detached.
    pub fn clear(&mut self) {
        debug!(len = self.len(), "clearing overlap tree");
        self.raw.clear();
    }

    /// The bounding box of every stored object, or `None` when the tree is empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Aabb<D>> {
        self.raw.root().map(|root| *self.raw.summary(root))
    }

    fn order(&self) -> MinBoundOrder<'_, E, C> {
        MinBoundOrder {
            extractor: &self.extractor,
            tie_break: &self.tie_break,
        }
    }

    // ─── Mutation ────────────────────────────────────────────────────────────

    /// Inserts `object` with `value` unless an equal object is already stored.
    ///
    /// Returns the position of the stored object.
    pub fn insert(&mut self, object: T, value: V) -> Position {
        let order = MinBoundOrder {
            extractor: &self.extractor,
            tie_break: &self.tie_break,
        };
        let mut hook = BoxHook {
            extractor: &self.extractor,
        };
        let (handle, _) = self.raw.insert(object, value, &order, &mut hook);
        self.raw.position(Some(handle))
    }

    /// Removes `object` and returns its value, or `None` if it is not stored.
    pub fn erase(&mut self, object: &T) -> Option<V> {
        let handle = self.raw.find(object, &self.order())?;
        let mut hook = BoxHook {
            extractor: &self.extractor,
        };
        let (_, value) = self.raw.remove(handle, &mut hook);
        Some(value)
    }

    /// Removes the object at `position` and returns the position of its successor.
    ///
    /// # Errors
    ///
    /// Fails without touching the tree if `position` belongs to another tree or its object
    /// has already been erased.
    pub fn erase_at(&mut self, position: Position) -> Result<Position, PositionError> {
        match self.raw.resolve(position) {
            Ok(Some(handle)) => {
                let next = self.raw.successor(handle);
                let mut hook = BoxHook {
                    extractor: &self.extractor,
                };
                self.raw.remove(handle, &mut hook);
                Ok(self.raw.position(next))
            }
            Ok(None) => Ok(self.raw.end()),
            Err(error) => {
                debug!(%error, tree = %self.id(), "rejected position");
                Err(error)
            }
        }
    }

    /// Replaces the contents with a balanced tree built from `items`.
    ///
    /// Where objects tie under the tree's order, the first occurrence wins.
    pub fn construct<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (T, V)>,
    {
        let order = MinBoundOrder {
            extractor: &self.extractor,
            tie_break: &self.tie_break,
        };
        let mut items: Vec<(T, V)> = items.into_iter().collect();
        items.sort_by(|a, b| order.compare(&a.0, &b.0));
        items.dedup_by(|later, earlier| !order.less(&earlier.0, &later.0));

        self.raw.clear();
        let mut hook = BoxHook {
            extractor: &self.extractor,
        };
        self.raw.build_sorted(items, &mut hook);
        debug!(len = self.len(), height = self.height(), "constructed overlap tree");
    }

    // ─── Lookup ──────────────────────────────────────────────────────────────

    /// Returns the position of `object`, or the end sentinel.
    #[must_use]
    pub fn find(&self, object: &T) -> Position {
        self.raw.position(self.raw.find(object, &self.order()))
    }

    #[must_use]
    pub fn contains(&self, object: &T) -> bool {
        self.raw.find(object, &self.order()).is_some()
    }

    /// Position of the greatest object not ordered after `object`.
    #[must_use]
    pub fn find_lower(&self, object: &T) -> Position {
        self.raw.position(self.raw.find_lower(object, &self.order()))
    }

    /// Position of the least object not ordered before `object`.
    #[must_use]
    pub fn find_upper(&self, object: &T) -> Position {
        self.raw.position(self.raw.find_upper(object, &self.order()))
    }

    /// Position of the least object ordered strictly after `object`.
    #[must_use]
    pub fn find_successor(&self, object: &T) -> Position {
        self.raw.position(self.raw.find_successor(object, &self.order()))
    }

    // ─── Overlap queries ─────────────────────────────────────────────────────

    /// Returns true if the bounding box of any stored object overlaps the box of `query`.
    #[must_use]
    pub fn aabb_overlap_check(&self, query: &T) -> bool {
        self.overlaps(query).next().is_some()
    }

    /// Returns true if some stored object's box overlaps the box of `query` and
    /// `predicate(stored, query)` holds.
    ///
    /// The predicate is only called for objects whose boxes overlap, so it can be an exact
    /// (and expensive) intersection test.
    pub fn aabb_overlap_check_with<P>(&self, query: &T, predicate: P) -> bool
    where
        P: Fn(&T, &T) -> bool,
    {
        self.overlaps(query).any(|handle| predicate(self.raw.key(handle), query))
    }

    /// Appends the position of every stored object whose box overlaps the box of `query`,
    /// in no particular order.
    pub fn aabb_overlap_query<O>(&self, query: &T, out: &mut O)
    where
        O: Extend<Position>,
    {
        out.extend(self.overlaps(query).map(|handle| self.raw.position(Some(handle))));
    }

    /// Like [`aabb_overlap_query`](Self::aabb_overlap_query), keeping only the objects for
    /// which `predicate(stored, query)` holds.
    pub fn aabb_overlap_query_with<O, P>(&self, query: &T, out: &mut O, predicate: P)
    where
        O: Extend<Position>,
        P: Fn(&T, &T) -> bool,
    {
        out.extend(
            self.overlaps(query)
                .filter(|&handle| predicate(self.raw.key(handle), query))
                .map(|handle| self.raw.position(Some(handle))),
        );
    }

    fn overlaps(&self, query: &T) -> Overlaps<'_, D, T, V, E> {
        let mut stack = SmallVec::new();
        stack.extend(self.raw.root());
        Overlaps {
            raw: &self.raw,
            extractor: &self.extractor,
            query: Aabb::of(query, &self.extractor),
            stack,
        }
    }
}

impl<const D: usize, T, E, V, C> OverlapTree<D, T, E, V, C> {
    // ─── Positions ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn end(&self) -> Position {
        self.raw.end()
    }

    /// Position of the object with the smallest lower bound on axis 0.
    #[must_use]
    pub fn get_min(&self) -> Position {
        self.raw.position(self.raw.first())
    }

    /// Position of the object with the largest lower bound on axis 0.
    #[must_use]
    pub fn get_max(&self) -> Position {
        self.raw.position(self.raw.last())
    }

    #[must_use]
    pub fn next(&self, position: Position) -> Position {
        self.raw.next_position(position)
    }

    #[must_use]
    pub fn prev(&self, position: Position) -> Position {
        self.raw.prev_position(position)
    }

    #[must_use]
    pub fn offset(&self, position: Position, steps: isize) -> Position {
        self.raw.offset(position, steps)
    }

    /// The object at `position`.
    #[must_use]
    pub fn key(&self, position: Position) -> Option<&T> {
        self.raw.locate(position).map(|handle| self.raw.key(handle))
    }

    #[must_use]
    pub fn value(&self, position: Position) -> Option<&V> {
        self.raw.locate(position).map(|handle| self.raw.value(handle))
    }

    pub fn value_mut(&mut self, position: Position) -> Option<&mut V> {
        self.raw.locate(position).map(|handle| self.raw.value_mut(handle))
    }

    #[must_use]
    pub fn get(&self, position: Position) -> Option<(&T, &V)> {
        self.raw.locate(position).map(|handle| (self.raw.key(handle), self.raw.value(handle)))
    }

    // ─── Iteration ───────────────────────────────────────────────────────────

    pub fn iter(&self) -> Iter<'_, T, V> {
        Iter::new(&self.raw)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T, V> {
        IterMut::new(&mut self.raw)
    }

    pub fn keys(&self) -> Keys<'_, T, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, T, V> {
        Values::new(self.iter())
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, T, V> {
        ValuesMut::new(self.iter_mut())
    }
}

impl<const D: usize, T, E: Extractor<T>, C: Comparator<T>> OverlapTree<D, T, E, (), C> {
    /// Inserts a bare object.
    pub fn insert_key(&mut self, object: T) -> Position {
        self.insert(object, ())
    }
}

// Depth-first walk over the nodes whose box overlaps `query`.
struct Overlaps<'a, const D: usize, T, V, E> {
    raw: &'a RawAvlTree<T, V, Aabb<D>>,
    extractor: &'a E,
    query: Aabb<D>,
    stack: SmallVec<[Handle; 32]>,
}

impl<const D: usize, T, V, E: Extractor<T>> Iterator for Overlaps<'_, D, T, V, E> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        while let Some(handle) = self.stack.pop() {
            if !self.raw.summary(handle).overlaps(&self.query) {
                continue;
            }

            let node = self.raw.node(handle);
            let own = Aabb::of(node.key(), self.extractor);

            // Everything to the right starts at or after this node on axis 0.
            if own.min[0] <= self.query.max[0] {
                self.stack.extend(node.right());
            }
            self.stack.extend(node.left());

            if own.overlaps(&self.query) {
                return Some(handle);
            }
        }
        None
    }
}

impl<const D: usize, T: Clone, E: Clone, V: Clone, C: Clone> Clone for OverlapTree<D, T, E, V, C> {
    fn clone(&self) -> Self {
        OverlapTree {
            raw: self.raw.clone(),
            extractor: self.extractor.clone(),
            tie_break: self.tie_break.clone(),
        }
    }
}

impl<const D: usize, T: fmt::Debug, E, V: fmt::Debug, C> fmt::Debug for OverlapTree<D, T, E, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<const D: usize, T, E, V, C> FromIterator<(T, V)> for OverlapTree<D, T, E, V, C>
where
    E: Extractor<T> + Default,
    C: Comparator<T> + Default,
{
    fn from_iter<I: IntoIterator<Item = (T, V)>>(iter: I) -> Self {
        let mut tree = OverlapTree::with_tie_break(E::default(), C::default());
        tree.construct(iter);
        tree
    }
}

impl<const D: usize, T, E: Extractor<T>, V, C: Comparator<T>> Extend<(T, V)> for OverlapTree<D, T, E, V, C> {
    fn extend<I: IntoIterator<Item = (T, V)>>(&mut self, iter: I) {
        for (object, value) in iter {
            self.insert(object, value);
        }
    }
}

impl<'a, const D: usize, T, E, V, C> IntoIterator for &'a OverlapTree<D, T, E, V, C> {
    type Item = (&'a T, &'a V);
    type IntoIter = Iter<'a, T, V>;

    fn into_iter(self) -> Iter<'a, T, V> {
        self.iter()
    }
}

impl<const D: usize, T, E, V, C> IntoIterator for OverlapTree<D, T, E, V, C> {
    type Item = (T, V);
    type IntoIter = IntoIter<T, V>;

    fn into_iter(mut self) -> IntoIter<T, V> {
        IntoIter::new(&mut self.raw)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec;

    // Closed 1D intervals `(start, end)`.
    fn interval(object: &(i32, i32), kind: BoundKind, _axis: usize) -> f64 {
        f64::from(match kind {
            BoundKind::Min => object.0,
            BoundKind::Max => object.1,
        })
    }

    impl<const D: usize, T, E: Extractor<T>, V, C> OverlapTree<D, T, E, V, C> {
        fn validate_boxes(&self) {
            let mut current = self.raw.first();
            while let Some(handle) = current {
                let node = self.raw.node(handle);
                let expected = [node.left(), node.right()]
                    .into_iter()
                    .flatten()
                    .fold(Aabb::of(node.key(), &self.extractor), |bounds, child| bounds.union(self.raw.summary(child)));
                assert_eq!(*self.raw.summary(handle), expected, "stale box at {handle:?}");
                current = self.raw.successor(handle);
            }
        }
    }

    #[test]
    fn boxes_touching_at_a_corner_overlap() {
        let a = Aabb::new([0.0, 0.0], [1.0, 1.0]);
        let b = Aabb::new([1.0, 1.0], [2.0, 2.0]);
        let c = Aabb::new([1.5, 0.0], [2.0, 0.5]);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!Aabb::<2>::default().overlaps(&a));
        assert_eq!(a.union(&Aabb::default()), a);
        assert_eq!(a.union(&c), Aabb::new([0.0, 0.0], [2.0, 1.0]));
    }

    #[test]
    fn subtree_boxes_follow_mutations() {
        let mut tree: OverlapTree<1, (i32, i32), _> = OverlapTree::new(interval);
        for start in 0..50 {
            tree.insert_key((start, start + (start * 7) % 13));
            tree.validate_boxes();
        }
        assert_eq!(tree.bounding_box(), Some(Aabb::new([0.0], [59.0])));

        for start in (0..50).step_by(2) {
            let end = start + (start * 7) % 13;
            assert_eq!(tree.erase(&(start, end)), Some(()));
            tree.validate_boxes();
        }
        assert_eq!(tree.len(), 25);
    }

    #[test]
    fn query_reports_only_overlapping_intervals() {
        let mut tree: OverlapTree<1, (i32, i32), _> = OverlapTree::new(interval);
        tree.construct((0..100).map(|start| ((start * 10, start * 10 + 5), ())));

        assert_eq!(tree.overlaps(&(12, 14)).count(), 1);
        assert_eq!(tree.overlaps(&(6, 9)).count(), 0);

        let mut hits = vec![];
        tree.aabb_overlap_query(&(15, 20), &mut hits);
        let mut keys: Vec<_> = hits.iter().filter_map(|&at| tree.key(at).copied()).collect();
        keys.sort_unstable();
        assert_eq!(keys, [(10, 15), (20, 25)]);
    }

    #[test]
    fn empty_tree_has_no_overlaps() {
        let tree: OverlapTree<1, (i32, i32), _> = OverlapTree::new(interval);
        assert!(!tree.aabb_overlap_check(&(0, 10)));
        assert_eq!(tree.bounding_box(), None);
        assert!(tree.get_min().is_end());
    }
}

//! A multidimensional range tree.
//!
//! A range tree over `D` dimensions is an AVL tree ordered by the first dimension's
//! comparator in which every node links to an *associated structure*: a tree over the
//! objects of that node's subtree, ordered by the next dimension's comparator, whose nodes
//! link further down in turn. Trees of the last dimension carry no links. A box query walks
//! the first dimension to the split node and hands every subtree that lies fully inside the
//! query range (a *canonical* subtree) to that subtree's associated structure, one dimension
//! deeper, instead of descending into it.
//!
//! Associated structures live in one arena owned by the range tree and are rebuilt
//! whenever the subtree they index changes.

use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use smallvec::{SmallVec, smallvec};
use tracing::{debug, trace};

use crate::avl_tree::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::compare::Comparator;
use crate::error::PositionError;
use crate::position::{Position, TreeId};
use crate::raw::{Arena, Handle, RawAvlTree, Summarize};

/// Points with a fixed number of `f64` coordinates.
pub trait Coordinates {
    /// Number of axes.
    const DIMENSIONS: usize;

    /// The coordinate along `axis` (counted from 0).
    fn coordinate(&self, axis: usize) -> f64;
}

impl<const N: usize> Coordinates for [f64; N] {
    const DIMENSIONS: usize = N;

    #[inline]
    fn coordinate(&self, axis: usize) -> f64 {
        self[axis]
    }
}

impl Coordinates for (f64, f64) {
    const DIMENSIONS: usize = 2;

    #[inline]
    fn coordinate(&self, axis: usize) -> f64 {
        match axis {
            0 => self.0,
            1 => self.1,
            _ => panic!("`Coordinates::coordinate()` - axis {axis} out of range for a 2D point!"),
        }
    }
}

impl Coordinates for (f64, f64, f64) {
    const DIMENSIONS: usize = 3;

    #[inline]
    fn coordinate(&self, axis: usize) -> f64 {
        match axis {
            0 => self.0,
            1 => self.1,
            2 => self.2,
            _ => panic!("`Coordinates::coordinate()` - axis {axis} out of range for a 3D point!"),
        }
    }
}

/// Orders points by one axis first, then by the following axes (wrapping around).
///
/// Because every axis takes part, two points are equal only if all their coordinates are,
/// and a point `p` lies in the box `[low, high]` exactly when `low <= p <= high` under the
/// `AxisOrder` of every axis. Coordinates are compared with [`f64::total_cmp`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct AxisOrder {
    axis: usize,
}

impl AxisOrder {
    #[must_use]
    pub const fn new(axis: usize) -> Self {
        AxisOrder { axis }
    }

    #[must_use]
    pub const fn axis(&self) -> usize {
        self.axis
    }
}

impl<T: Coordinates + ?Sized> Comparator<T> for AxisOrder {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    fn compare(&self, a: &T, b: &T) -> Ordering {
        let axes = T::DIMENSIONS;
        (0..axes)
            .map(|step| (self.axis + step) % axes)
            .map(|axis| a.coordinate(axis).total_cmp(&b.coordinate(axis)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// A balanced tree answering axis-aligned box queries over `D` dimensions.
///
/// The dimension count is the number of comparators given at construction; dimension `d`
/// orders objects with comparator `d`. Each comparator must be a strict weak ordering, and
/// the first one decides which objects are duplicates: inserting an object that compares
/// equal to a stored one under the first comparator leaves the tree unchanged.
///
/// Insertion and erasure rebuild the associated structures of every node on the path to
/// the root, which makes them much more expensive than queries. Building the whole tree
/// with [`construct`](Self::construct) is the intended way to fill it.
///
/// # Examples
///
/// ```
/// use avl_index::RangeTree;
///
/// let mut tree: RangeTree<(f64, f64)> = RangeTree::new();
/// tree.construct([(12.0, 15.9), (2.0, 10.1), (45.0, 65.0), (3.0, 25.0)].map(|p| (p, ())));
///
/// let mut found = Vec::new();
/// tree.range_query(&(3.0, 15.0), &(50.0, 65.0), &mut found);
///
/// let mut points: Vec<_> = found.into_iter().filter_map(|at| tree.key(at).copied()).collect();
/// points.sort_by(|a, b| a.partial_cmp(b).unwrap());
/// assert_eq!(points, [(3.0, 25.0), (12.0, 15.9), (45.0, 65.0)]);
/// ```
pub struct RangeTree<T, V = (), C = AxisOrder> {
    comparators: Vec<C>,
    primary: RawAvlTree<T, V, Link>,
    levels: Arena<Level<T>>,
}

// Summary slot of a range tree node: the associated structure of its subtree, if the tree
// is not of the last dimension.
#[derive(Clone, Copy, Debug, Default)]
struct Link(Option<Handle>);

// An associated structure. Values are the handles of the objects in the primary tree.
#[derive(Clone)]
struct Level<T> {
    tree: RawAvlTree<T, Handle, Link>,
}

// Summary hook for trees of dimension `dim`; builds and frees associated structures.
struct Levels<'a, T, C> {
    comparators: &'a [C],
    arena: &'a mut Arena<Level<T>>,
    dim: usize,
}

impl<T: Clone, C: Comparator<T>> Levels<'_, T, C> {
    fn build(&mut self, origin: Handle, key: &T, left: Option<&Link>, right: Option<&Link>) -> Link {
        let next = self.dim + 1;
        let comparators = self.comparators;
        let Some(cmp) = comparators.get(next) else {
            return Link(None);
        };

        let left = left.map_or_else(Vec::new, |&link| self.items(link));
        let right = right.map_or_else(Vec::new, |&link| self.items(link));
        let mut items = merge(left, right, cmp);
        let at = items.partition_point(|(item, _)| cmp.less(item, key));
        items.insert(at, (key.clone(), origin));

        trace!(dim = next, len = items.len(), "rebuilding associated structure");
        let mut tree = RawAvlTree::with_capacity(items.len());
        let mut nested = Levels {
            comparators,
            arena: &mut *self.arena,
            dim: next,
        };
        tree.build_sorted(items, &mut nested);
        Link(Some(self.arena.alloc(Level { tree })))
    }

    // The objects of an associated structure, in its order.
    fn items(&self, link: Link) -> Vec<(T, Handle)> {
        let Link(Some(level)) = link else {
            return Vec::new();
        };
        Iter::new(&self.arena.get(level).tree).map(|(item, &origin)| (item.clone(), origin)).collect()
    }

    fn free(&mut self, link: Link) {
        let Link(Some(level)) = link else {
            return;
        };
        let mut level = self.arena.take(level);
        for nested in level.tree.take_summaries() {
            self.free(nested);
        }
    }
}

impl<T: Clone, C: Comparator<T>> Summarize<T, Handle, Link> for Levels<'_, T, C> {
    fn summarize(&mut self, _node: Handle, key: &T, origin: &Handle, left: Option<&Link>, right: Option<&Link>) -> Link {
        self.build(*origin, key, left, right)
    }

    fn release(&mut self, link: Link) {
        self.free(link);
    }
}

// Hook for the primary tree, where an object's origin is its own node.
struct PrimaryHook<'a, T, C>(Levels<'a, T, C>);

impl<T: Clone, V, C: Comparator<T>> Summarize<T, V, Link> for PrimaryHook<'_, T, C> {
    fn summarize(&mut self, node: Handle, key: &T, _value: &V, left: Option<&Link>, right: Option<&Link>) -> Link {
        self.0.build(node, key, left, right)
    }

    fn release(&mut self, link: Link) {
        self.0.free(link);
    }
}

fn merge<T, C: Comparator<T>>(left: Vec<(T, Handle)>, right: Vec<(T, Handle)>, cmp: &C) -> Vec<(T, Handle)> {
    let mut merged = Vec::with_capacity(left.len() + right.len() + 1);
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp.less(&r.0, &l.0),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    merged
}

impl<T: Coordinates, V> RangeTree<T, V, AxisOrder> {
    /// Makes a new, empty tree over every axis of `T`, ordering dimension `d` by
    /// `AxisOrder::new(d)`.
    #[must_use]
    pub fn new() -> Self {
        RangeTree::with_dimensions(T::DIMENSIONS)
    }

    /// Makes a new, empty tree over the first `dimensions` axes of `T`.
    ///
    /// # Panics
    ///
    /// Panics if `dimensions` is zero or greater than `T::DIMENSIONS`.
    #[must_use]
    pub fn with_dimensions(dimensions: usize) -> Self {
        assert!(
            dimensions <= T::DIMENSIONS,
            "`RangeTree::with_dimensions()` - `dimensions` exceeds the axes of the point type!"
        );
        RangeTree::with_comparators((0..dimensions).map(AxisOrder::new))
    }
}

impl<T, V, C> RangeTree<T, V, C> {
    /// Makes a new, empty tree with one dimension per comparator.
    ///
    /// # Panics
    ///
    /// Panics if `comparators` is empty.
    #[must_use]
    pub fn with_comparators<I>(comparators: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        RangeTree::with_capacity(0, comparators)
    }

    /// Makes a new, empty tree with room for at least `capacity` objects.
    ///
    /// # Panics
    ///
    /// Panics if `comparators` is empty.
    #[must_use]
    pub fn with_capacity<I>(capacity: usize, comparators: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let comparators: Vec<C> = comparators.into_iter().collect();
        assert!(!comparators.is_empty(), "`RangeTree::with_capacity()` - a range tree needs at least one dimension!");
        RangeTree {
            comparators,
            primary: RawAvlTree::with_capacity(capacity),
            levels: Arena::new(),
        }
    }

    /// Number of dimensions the tree indexes.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.comparators.len()
    }

    /// The comparators, one per dimension.
    #[must_use]
    pub fn comparators(&self) -> &[C] {
        &self.comparators
    }

    #[must_use]
    pub const fn id(&self) -> TreeId {
        self.primary.id()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.primary.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Height of the first-dimension tree.
    #[must_use]
    pub fn height(&self) -> usize {
        self.primary.height()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.primary.capacity()
    }

    /// Removes every object and every associated structure.
    pub fn clear(&mut self) {
        debug!(len = self.len(), levels = self.levels.len(), "clearing range tree");
        self.primary.clear();
        self.levels.clear();
    }

    #[must_use]
    pub fn end(&self) -> Position {
        self.primary.end()
    }

    /// Position of the least object under the first comparator.
    #[must_use]
    pub fn get_min(&self) -> Position {
        self.primary.position(self.primary.first())
    }

    /// Position of the greatest object under the first comparator.
    #[must_use]
    pub fn get_max(&self) -> Position {
        self.primary.position(self.primary.last())
    }

    #[must_use]
    pub fn next(&self, position: Position) -> Position {
        self.primary.next_position(position)
    }

    #[must_use]
    pub fn prev(&self, position: Position) -> Position {
        self.primary.prev_position(position)
    }

    #[must_use]
    pub fn offset(&self, position: Position, steps: isize) -> Position {
        self.primary.offset(position, steps)
    }

    #[must_use]
    pub fn key(&self, position: Position) -> Option<&T> {
        self.primary.locate(position).map(|handle| self.primary.key(handle))
    }

    #[must_use]
    pub fn value(&self, position: Position) -> Option<&V> {
        self.primary.locate(position).map(|handle| self.primary.value(handle))
    }

    pub fn value_mut(&mut self, position: Position) -> Option<&mut V> {
        self.primary.locate(position).map(|handle| self.primary.value_mut(handle))
    }

    #[must_use]
    pub fn get(&self, position: Position) -> Option<(&T, &V)> {
        self.primary.locate(position).map(|handle| (self.primary.key(handle), self.primary.value(handle)))
    }

    /// Iterates over the objects in the order of the first comparator.
    pub fn iter(&self) -> Iter<'_, T, V> {
        Iter::new(&self.primary)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T, V> {
        IterMut::new(&mut self.primary)
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

impl<T, V, C: Comparator<T>> RangeTree<T, V, C> {
    /// Returns the position of `object`, or the end sentinel.
    #[must_use]
    pub fn find(&self, object: &T) -> Position {
        self.primary.position(self.primary.find(object, &self.comparators[0]))
    }

    #[must_use]
    pub fn contains(&self, object: &T) -> bool {
        self.primary.find(object, &self.comparators[0]).is_some()
    }

    /// Position of the greatest object not after `object` under the first comparator.
    #[must_use]
    pub fn find_lower(&self, object: &T) -> Position {
        self.primary.position(self.primary.find_lower(object, &self.comparators[0]))
    }

    /// Position of the least object not before `object` under the first comparator.
    #[must_use]
    pub fn find_upper(&self, object: &T) -> Position {
        self.primary.position(self.primary.find_upper(object, &self.comparators[0]))
    }

    /// Position of the least object strictly after `object` under the first comparator.
    #[must_use]
    pub fn find_successor(&self, object: &T) -> Position {
        self.primary.position(self.primary.find_successor(object, &self.comparators[0]))
    }

    /// Appends the position of every object `p` with `low <= p <= high` under every
    /// dimension's comparator, in no particular order.
    ///
    /// With [`AxisOrder`] comparators this is every point inside the closed box spanned by
    /// the corners `low` and `high`.
    pub fn range_query<O>(&self, low: &T, high: &T, out: &mut O)
    where
        O: Extend<Position>,
    {
        self.query_tree(&self.primary, 0, low, high, |node, _| node, out);
    }

    fn within(&self, dim: usize, object: &T, low: &T, high: &T) -> bool {
        self.comparators[dim..].iter().all(|cmp| !cmp.less(object, low) && !cmp.less(high, object))
    }

    fn report<O: Extend<Position>>(&self, origin: Handle, out: &mut O) {
        out.extend(Some(self.primary.position(Some(origin))));
    }

    fn query_tree<X, O>(
        &self,
        tree: &RawAvlTree<T, X, Link>,
        dim: usize,
        low: &T,
        high: &T,
        origin: fn(Handle, &X) -> Handle,
        out: &mut O,
    ) where
        O: Extend<Position>,
    {
        let cmp = &self.comparators[dim];

        let mut split = tree.root();
        while let Some(handle) = split {
            let node = tree.node(handle);
            if cmp.less(node.key(), low) {
                split = node.right();
            } else if cmp.less(high, node.key()) {
                split = node.left();
            } else {
                break;
            }
        }
        let Some(split) = split else {
            return;
        };

        if self.within(dim, tree.key(split), low, high) {
            self.report(origin(split, tree.value(split)), out);
        }

        // Left path: everything right of a node at or above `low` is inside on this dimension.
        let mut current = tree.node(split).left();
        while let Some(handle) = current {
            let node = tree.node(handle);
            if cmp.less(node.key(), low) {
                current = node.right();
            } else {
                if self.within(dim, node.key(), low, high) {
                    self.report(origin(handle, tree.value(handle)), out);
                }
                if let Some(right) = node.right() {
                    self.canonical(tree, right, dim, low, high, origin, out);
                }
                current = node.left();
            }
        }

        let mut current = tree.node(split).right();
        while let Some(handle) = current {
            let node = tree.node(handle);
            if cmp.less(high, node.key()) {
                current = node.left();
            } else {
                if self.within(dim, node.key(), low, high) {
                    self.report(origin(handle, tree.value(handle)), out);
                }
                if let Some(left) = node.left() {
                    self.canonical(tree, left, dim, low, high, origin, out);
                }
                current = node.right();
            }
        }
    }

    // `root` spans a subtree lying inside the query range on dimension `dim`.
    #[allow(clippy::too_many_arguments)]
    fn canonical<X, O>(
        &self,
        tree: &RawAvlTree<T, X, Link>,
        root: Handle,
        dim: usize,
        low: &T,
        high: &T,
        origin: fn(Handle, &X) -> Handle,
        out: &mut O,
    ) where
        O: Extend<Position>,
    {
        if dim + 1 == self.comparators.len() {
            let mut stack: SmallVec<[Handle; 32]> = smallvec![root];
            while let Some(handle) = stack.pop() {
                let node = tree.node(handle);
                stack.extend(node.left());
                stack.extend(node.right());
                self.report(origin(handle, tree.value(handle)), out);
            }
            return;
        }

        let Link(level) = *tree.summary(root);
        let level = level.expect("`RangeTree::canonical()` - subtree has no associated structure!");
        self.query_tree(&self.levels.get(level).tree, dim + 1, low, high, |_, &origin| origin, out);
    }
}

impl<T: Clone, V, C: Comparator<T>> RangeTree<T, V, C> {
    /// Inserts `object` with `value` unless an equal object is already stored, rebuilding
    /// the associated structures along the insertion path.
    pub fn insert(&mut self, object: T, value: V) -> Position {
        let mut hook = PrimaryHook(Levels {
            comparators: &self.comparators,
            arena: &mut self.levels,
            dim: 0,
        });
        let (handle, _) = self.primary.insert(object, value, &self.comparators[0], &mut hook);
        self.primary.position(Some(handle))
    }

    /// Removes `object` and returns its value, or `None` if it is not stored.
    pub fn erase(&mut self, object: &T) -> Option<V> {
        let handle = self.primary.find(object, &self.comparators[0])?;
        let mut hook = PrimaryHook(Levels {
            comparators: &self.comparators,
            arena: &mut self.levels,
            dim: 0,
        });
        let (_, value) = self.primary.remove(handle, &mut hook);
        Some(value)
    }

    /// Removes the object at `position` and returns the position of its successor.
    ///
    /// # Errors
    ///
    /// Fails without touching the tree if `position` belongs to another tree or its object
    /// has already been erased.
    pub fn erase_at(&mut self, position: Position) -> Result<Position, PositionError> {
        match self.primary.resolve(position) {
            Ok(Some(handle)) => {
                let next = self.primary.successor(handle);
                let mut hook = PrimaryHook(Levels {
                    comparators: &self.comparators,
                    arena: &mut self.levels,
                    dim: 0,
                });
                self.primary.remove(handle, &mut hook);
                Ok(self.primary.position(next))
            }
            Ok(None) => Ok(self.primary.end()),
            Err(error) => {
                debug!(%error, tree = %self.id(), "rejected position");
                Err(error)
            }
        }
    }

    /// Replaces the contents with a tree built bottom-up from `items`.
    ///
    /// Every associated structure is built by merging the already sorted structures of its
    /// node's children. Where objects tie under the first comparator, the first occurrence
    /// wins.
    pub fn construct<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (T, V)>,
    {
        let cmp = &self.comparators[0];
        let mut items: Vec<(T, V)> = items.into_iter().collect();
        items.sort_by(|a, b| cmp.compare(&a.0, &b.0));
        items.dedup_by(|later, earlier| !cmp.less(&earlier.0, &later.0));

        self.primary.clear();
        self.levels.clear();
        let mut hook = PrimaryHook(Levels {
            comparators: &self.comparators,
            arena: &mut self.levels,
            dim: 0,
        });
        self.primary.build_sorted(items, &mut hook);
        debug!(
            len = self.len(),
            dimensions = self.dimensions(),
            levels = self.levels.len(),
            "constructed range tree"
        );
    }
}

impl<T: Clone, V: Clone, C: Clone> Clone for RangeTree<T, V, C> {
    fn clone(&self) -> Self {
        RangeTree {
            comparators: self.comparators.clone(),
            primary: self.primary.clone(),
            levels: self.levels.clone(),
        }
    }
}

impl<T: fmt::Debug, V: fmt::Debug, C> fmt::Debug for RangeTree<T, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T: Coordinates, V> Default for RangeTree<T, V, AxisOrder> {
    fn default() -> Self {
        RangeTree::new()
    }
}

impl<T: Coordinates + Clone, V> FromIterator<(T, V)> for RangeTree<T, V, AxisOrder> {
    fn from_iter<I: IntoIterator<Item = (T, V)>>(iter: I) -> Self {
        let mut tree = RangeTree::new();
        tree.construct(iter);
        tree
    }
}

impl<T: Clone, V, C: Comparator<T>> Extend<(T, V)> for RangeTree<T, V, C> {
    fn extend<I: IntoIterator<Item = (T, V)>>(&mut self, iter: I) {
        for (object, value) in iter {
            self.insert(object, value);
        }
    }
}

impl<'a, T, V, C> IntoIterator for &'a RangeTree<T, V, C> {
    type Item = (&'a T, &'a V);
    type IntoIter = Iter<'a, T, V>;

    fn into_iter(self) -> Iter<'a, T, V> {
        self.iter()
    }
}

impl<T, V, C> IntoIterator for RangeTree<T, V, C> {
    type Item = (T, V);
    type IntoIter = IntoIter<T, V>;

    fn into_iter(mut self) -> IntoIter<T, V> {
        IntoIter::new(&mut self.primary)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec;

    impl<T: Clone + PartialEq + fmt::Debug, V, C: Comparator<T>> RangeTree<T, V, C> {
        /// Checks that every associated structure indexes exactly its node's subtree, in
        /// the next dimension's order, and that no structure is leaked.
        fn validate_levels(&self) {
            let reachable = self.validate_tree(&self.primary, 0, |node, _| node);
            assert_eq!(reachable, self.levels.len(), "associated structures leaked");
        }

        fn validate_tree<X>(&self, tree: &RawAvlTree<T, X, Link>, dim: usize, origin: fn(Handle, &X) -> Handle) -> usize {
            let mut reachable = 0;
            let mut current = tree.first();
            while let Some(handle) = current {
                current = tree.successor(handle);
                let Link(level) = *tree.summary(handle);
                let Some(next) = self.comparators.get(dim + 1) else {
                    assert!(level.is_none(), "last dimension carries a link");
                    continue;
                };

                let mut expected = Vec::new();
                let mut stack = vec![handle];
                while let Some(member) = stack.pop() {
                    let node = tree.node(member);
                    stack.extend(node.left());
                    stack.extend(node.right());
                    expected.push((tree.key(member).clone(), origin(member, tree.value(member))));
                }
                expected.sort_by(|a, b| next.compare(&a.0, &b.0));

                let level = &self.levels.get(level.expect("missing associated structure")).tree;
                let actual: Vec<(T, Handle)> = Iter::new(level).map(|(k, &o)| (k.clone(), o)).collect();
                assert_eq!(actual.len(), expected.len());
                for (a, e) in actual.iter().zip(&expected) {
                    assert_eq!(next.compare(&a.0, &e.0), Ordering::Equal);
                }
                let mut origins: Vec<Handle> = actual.iter().map(|(_, o)| *o).collect();
                let mut expected_origins: Vec<Handle> = expected.iter().map(|(_, o)| *o).collect();
                origins.sort_by_key(|h| h.to_index());
                expected_origins.sort_by_key(|h| h.to_index());
                assert_eq!(origins, expected_origins);

                reachable += 1 + self.validate_tree(level, dim + 1, |_, &o| o);
            }
            reachable
        }
    }

    #[test]
    fn axis_order_wraps_around() {
        let by_y = AxisOrder::new(1);
        assert!(by_y.less(&[5.0, 1.0], &[0.0, 2.0]));
        assert!(by_y.less(&[0.0, 2.0], &[1.0, 2.0]));
        assert_eq!(by_y.compare(&(1.0, 2.0), &(1.0, 2.0)), Ordering::Equal);
        assert!(AxisOrder::new(2).less(&(9.0, 0.0, 1.0), &(0.0, 9.0, 2.0)));
    }

    #[test]
    fn levels_track_inserts_and_erases() {
        let mut tree: RangeTree<[f64; 3]> = RangeTree::new();
        for i in 0..40u32 {
            let i = f64::from(i);
            tree.insert([(i * 7.0) % 11.0, (i * 3.0) % 5.0, i], ());
            tree.validate_levels();
        }
        for i in (0..40u32).step_by(3) {
            let i = f64::from(i);
            assert_eq!(tree.erase(&[(i * 7.0) % 11.0, (i * 3.0) % 5.0, i]), Some(()));
            tree.validate_levels();
        }
        assert_eq!(tree.len(), 26);
    }

    #[test]
    fn construct_replaces_and_frees_levels() {
        let mut tree: RangeTree<(f64, f64)> = RangeTree::new();
        tree.construct((0..64u32).map(|i| ((f64::from(i % 8), f64::from(i / 8)), ())));
        tree.validate_levels();
        assert_eq!(tree.len(), 64);

        tree.construct([((1.0, 1.0), ()), ((1.0, 1.0), ())]);
        tree.validate_levels();
        assert_eq!(tree.len(), 1);

        tree.clear();
        tree.validate_levels();
        assert!(tree.is_empty());
    }

    #[test]
    fn one_dimension_reports_whole_subtrees() {
        let tree: RangeTree<[f64; 1]> = (0..100u32).map(|i| ([f64::from(i)], ())).collect();
        let mut found = vec![];
        tree.range_query(&[10.0], &[19.5], &mut found);
        let mut keys: Vec<f64> = found.iter().filter_map(|&at| tree.key(at)).map(|p| p[0]).collect();
        keys.sort_by(f64::total_cmp);
        assert_eq!(keys, (10..20u32).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    #[should_panic(expected = "`RangeTree::with_capacity()` - a range tree needs at least one dimension!")]
    fn zero_dimensions_panics() {
        let _ = RangeTree::<[f64; 2]>::with_dimensions(0);
    }
}

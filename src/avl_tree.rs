//! An ordered map/set backed by an AVL tree, addressed through [`Position`] cursors.

use alloc::vec::Vec;
use core::fmt;
use core::iter::FusedIterator;

use tracing::debug;

use crate::compare::{Comparator, NaturalOrder};
use crate::error::PositionError;
use crate::position::{Position, TreeId};
use crate::raw::{Arena, Handle, NoSummary, Node, RawAvlTree, predecessor, successor};

/// An ordered collection of unique keys, each with an associated value, kept in a
/// height-balanced binary search tree.
///
/// Keys are ordered by the comparator `C` (by default the key's own [`Ord`]). Equal keys
/// are never stored twice: inserting a key that is already present leaves the tree
/// unchanged and returns the position of the existing element.
///
/// Elements are addressed through [`Position`] values, which behave like the iterators of a
/// node-based container: they stay valid while unrelated elements are inserted and erased,
/// step forwards and backwards with [`next`](Self::next)/[`prev`](Self::prev), and
/// dereference through [`key`](Self::key)/[`value`](Self::value)/
/// [`value_mut`](Self::value_mut). Keys are never mutable once inserted.
///
/// A tree with `V = ()` is an ordered set; see [`insert_key`](Self::insert_key).
///
/// # Examples
///
/// ```
/// use avl_index::AvlTree;
///
/// let mut tree = AvlTree::new();
/// for key in [2, 10, 3, 25, 12, 15, 45, 65, 100, 52] {
///     tree.insert_key(key);
/// }
///
/// assert!(!tree.find(&2).is_end());
/// tree.erase(&2);
/// assert!(tree.find(&2).is_end());
///
/// let keys: Vec<_> = tree.keys().copied().collect();
/// assert_eq!(keys, [3, 10, 12, 15, 25, 45, 52, 65, 100]);
/// ```
pub struct AvlTree<K, V = (), C = NaturalOrder> {
    raw: RawAvlTree<K, V>,
    cmp: C,
}

/// An iterator over the entries of a tree, sorted by key.
///
/// This `struct` is created by the [`iter`](AvlTree::iter) method on [`AvlTree`] (and by the
/// `iter` methods of the other trees in this crate).
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<Node<K>>,
    values: &'a Arena<V>,
    walk: Walk,
    remaining: usize,
}

/// A mutable iterator over the entries of a tree, sorted by key.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IterMut<'a, K, V> {
    nodes: &'a Arena<Node<K>>,
    // Indexed by value handle; each reference is handed out at most once.
    values: Vec<Option<&'a mut V>>,
    walk: Walk,
    remaining: usize,
}

/// An owning iterator over the entries of a tree, sorted by key.
///
/// ```
/// use avl_index::AvlTree;
///
/// let tree: AvlTree<i32, &str> = [(1, "a"), (2, "b")].into_iter().collect();
/// let mut iter = tree.into_iter();
/// assert_eq!(iter.next(), Some((1, "a")));
/// assert_eq!(iter.next_back(), Some((2, "b")));
/// assert_eq!(iter.next(), None);
/// ```
pub struct IntoIter<K, V> {
    inner: alloc::vec::IntoIter<(K, V)>,
}

/// An iterator over the keys of a tree, in order.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of a tree, in key order.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// A mutable iterator over the values of a tree, in key order.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

/// An iterator over the entries whose keys fall in a closed range.
///
/// This `struct` is created by the [`range`](AvlTree::range) method on [`AvlTree`].
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Range<'a, K, V> {
    nodes: &'a Arena<Node<K>>,
    values: &'a Arena<V>,
    walk: Walk,
}

/// An insertion sink for an [`AvlTree`].
///
/// Every element pushed into the inserter is inserted into the tree, so any iterator can be
/// copied into a tree with [`Extend::extend`]. Keys that are already present are left
/// alone, as with [`AvlTree::insert`].
///
/// ```
/// use avl_index::AvlTree;
///
/// let mut tree = AvlTree::new();
/// let mut inserter = tree.inserter();
/// inserter.extend([(3, 'c'), (1, 'a')]);
/// let last = inserter.push(2, 'b');
///
/// assert_eq!(tree.key(last), Some(&2));
/// assert_eq!(tree.values().collect::<String>(), "abc");
/// ```
pub struct Inserter<'a, K, V, C> {
    tree: &'a mut AvlTree<K, V, C>,
    last: Option<Position>,
}

// Front and back cursors of a double-ended in-order walk. Both become `None` once they
// have met.
#[derive(Clone, Copy, Debug)]
struct Walk {
    front: Option<Handle>,
    back: Option<Handle>,
}

impl Walk {
    fn new(bounds: Option<(Handle, Handle)>) -> Self {
        match bounds {
            Some((front, back)) => Walk {
                front: Some(front),
                back: Some(back),
            },
            None => Walk { front: None, back: None },
        }
    }

    fn over<K, V, S>(raw: &RawAvlTree<K, V, S>) -> Self {
        Walk {
            front: raw.first(),
            back: raw.last(),
        }
    }

    fn step_front<K>(&mut self, nodes: &Arena<Node<K>>) -> Option<Handle> {
        let current = self.front?;
        if self.front == self.back {
            *self = Walk { front: None, back: None };
        } else {
            self.front = successor(nodes, current);
        }
        Some(current)
    }

    fn step_back<K>(&mut self, nodes: &Arena<Node<K>>) -> Option<Handle> {
        let current = self.back?;
        if self.front == self.back {
            *self = Walk { front: None, back: None };
        } else {
            self.back = predecessor(nodes, current);
        }
        Some(current)
    }
}

impl<K: Ord, V> AvlTree<K, V> {
    /// Makes a new, empty `AvlTree` ordered by the keys' [`Ord`] implementation.
    ///
    /// Does not allocate anything on its own.
    #[must_use]
    pub fn new() -> Self {
        AvlTree::with_comparator(NaturalOrder)
    }

    /// Makes a new, empty `AvlTree` with room for at least `capacity` elements.
    ///
    /// ```
    /// use avl_index::AvlTree;
    ///
    /// let tree: AvlTree<u32, u32> = AvlTree::with_capacity(16);
    /// assert!(tree.capacity() >= 16);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        AvlTree::with_capacity_and_comparator(capacity, NaturalOrder)
    }
}

impl<K, V, C> AvlTree<K, V, C> {
    /// Makes a new, empty `AvlTree` ordered by `cmp`.
    #[must_use]
    pub fn with_comparator(cmp: C) -> Self {
        AvlTree {
            raw: RawAvlTree::new(),
            cmp,
        }
    }

    /// Makes a new, empty `AvlTree` ordered by `cmp` with room for at least `capacity`
    /// elements.
    #[must_use]
    pub fn with_capacity_and_comparator(capacity: usize, cmp: C) -> Self {
        AvlTree {
            raw: RawAvlTree::with_capacity(capacity),
            cmp,
        }
    }

    /// Returns the comparator that orders this tree.
    pub const fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Returns the identity stamped into this tree's positions.
    #[must_use]
    pub const fn id(&self) -> TreeId {
        self.raw.id()
    }

    /// Returns the number of elements in the tree.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the height of the tree; 0 when empty, 1 for a single element.
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns the number of elements the tree can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Removes every element. Every outstanding position becomes detached.
    pub fn clear(&mut self) {
        debug!(len = self.len(), "clearing tree");
        self.raw.clear();
    }

    // ─── Positions ───────────────────────────────────────────────────────────

    /// Returns the end sentinel of this tree.
    #[must_use]
    pub fn end(&self) -> Position {
        self.raw.end()
    }

    /// Returns the position of the smallest key, or the end sentinel if the tree is empty.
    #[must_use]
    pub fn get_min(&self) -> Position {
        self.raw.position(self.raw.first())
    }

    /// Returns the position of the largest key, or the end sentinel if the tree is empty.
    #[must_use]
    pub fn get_max(&self) -> Position {
        self.raw.position(self.raw.last())
    }

    /// Returns the position after `position` in key order.
    ///
    /// The successor of the largest key, and of the end sentinel itself, is the end
    /// sentinel. Positions that do not belong to this tree (or were detached) also map to
    /// the end sentinel.
    #[must_use]
    pub fn next(&self, position: Position) -> Position {
        self.raw.next_position(position)
    }

    /// Returns the position before `position` in key order.
    ///
    /// The predecessor of the end sentinel is the largest key; the predecessor of the
    /// smallest key is the end sentinel.
    ///
    /// ```
    /// use avl_index::AvlTree;
    ///
    /// let tree: AvlTree<i32> = [1, 2, 3].into_iter().map(|k| (k, ())).collect();
    /// assert_eq!(tree.key(tree.prev(tree.end())), Some(&3));
    /// assert!(tree.prev(tree.get_min()).is_end());
    /// ```
    #[must_use]
    pub fn prev(&self, position: Position) -> Position {
        self.raw.prev_position(position)
    }

    /// Moves `position` by `steps` elements, backwards when `steps` is negative.
    ///
    /// Running off either end yields the end sentinel; an offset never goes past it.
    ///
    /// ```
    /// use avl_index::AvlTree;
    ///
    /// let tree: AvlTree<i32> = (1..=5).map(|k| (k, ())).collect();
    /// assert_eq!(tree.key(tree.offset(tree.get_min(), 3)), Some(&4));
    /// assert_eq!(tree.key(tree.offset(tree.end(), -2)), Some(&4));
    /// assert!(tree.offset(tree.get_min(), 10).is_end());
    /// ```
    #[must_use]
    pub fn offset(&self, position: Position, steps: isize) -> Position {
        self.raw.offset(position, steps)
    }

    /// Returns the key at `position`, or `None` for the end sentinel and unusable positions.
    #[must_use]
    pub fn key(&self, position: Position) -> Option<&K> {
        self.raw.locate(position).map(|handle| self.raw.key(handle))
    }

    /// Returns the value at `position`.
    #[must_use]
    pub fn value(&self, position: Position) -> Option<&V> {
        self.raw.locate(position).map(|handle| self.raw.value(handle))
    }

    /// Returns a mutable reference to the value at `position`.
    pub fn value_mut(&mut self, position: Position) -> Option<&mut V> {
        self.raw.locate(position).map(|handle| self.raw.value_mut(handle))
    }

    /// Returns the key and value at `position`.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<(&K, &V)> {
        self.raw.locate(position).map(|handle| (self.raw.key(handle), self.raw.value(handle)))
    }

    // ─── Iteration ───────────────────────────────────────────────────────────

    /// Gets an iterator over the entries of the tree, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.raw)
    }

    /// Gets a mutable iterator over the entries of the tree, sorted by key.
    ///
    /// ```
    /// use avl_index::AvlTree;
    ///
    /// let mut tree: AvlTree<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
    /// for (_, value) in tree.iter_mut() {
    ///     *value *= 10;
    /// }
    /// assert_eq!(tree.values().copied().collect::<Vec<_>>(), [10, 20]);
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.raw)
    }

    /// Gets an iterator over the keys of the tree, in order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Gets an iterator over the values of the tree, in key order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Gets a mutable iterator over the values of the tree, in key order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }
}

impl<K, V, C: Comparator<K>> AvlTree<K, V, C> {
    /// Inserts `key` with `value` unless an equal key is already present.
    ///
    /// Returns the position of the element holding the key: the new element, or the
    /// existing one (whose value is left untouched) when the key was a duplicate.
    ///
    /// ```
    /// use avl_index::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// let first = tree.insert(1, "one");
    /// let again = tree.insert(1, "uno");
    /// assert_eq!(first, again);
    /// assert_eq!(tree.value(again), Some(&"one"));
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Position {
        let (handle, _) = self.raw.insert(key, value, &self.cmp, &mut NoSummary);
        self.raw.position(Some(handle))
    }

    /// Removes the element with key `key` and returns its value.
    ///
    /// Erasing a key that is not present does nothing and returns `None`.
    pub fn erase(&mut self, key: &K) -> Option<V> {
        let handle = self.raw.find(key, &self.cmp)?;
        let (_, value) = self.raw.remove(handle, &mut NoSummary);
        Some(value)
    }

    /// Removes the element at `position` and returns the position of its in-order
    /// successor, so that a loop can erase while it walks.
    ///
    /// Erasing at the end sentinel does nothing and returns the end sentinel.
    ///
    /// # Errors
    ///
    /// Fails without touching the tree if `position` was produced by another tree, or if
    /// its element has already been erased.
    ///
    /// ```
    /// use avl_index::AvlTree;
    ///
    /// let mut tree: AvlTree<i32> = (1..=6).map(|k| (k, ())).collect();
    /// let mut at = tree.get_min();
    /// while let Some(&key) = tree.key(at) {
    ///     at = if key % 2 == 0 { tree.erase_at(at)? } else { tree.next(at) };
    /// }
    /// assert_eq!(tree.keys().copied().collect::<Vec<_>>(), [1, 3, 5]);
    /// # Ok::<(), avl_index::PositionError>(())
    /// ```
    pub fn erase_at(&mut self, position: Position) -> Result<Position, PositionError> {
        match self.raw.resolve(position) {
            Ok(Some(handle)) => {
                let next = self.raw.successor(handle);
                self.raw.remove(handle, &mut NoSummary);
                Ok(self.raw.position(next))
            }
            Ok(None) => Ok(self.raw.end()),
            Err(error) => {
                debug!(%error, tree = %self.id(), "rejected position");
                Err(error)
            }
        }
    }

    /// Returns the position of `key`, or the end sentinel if it is not present.
    #[must_use]
    pub fn find(&self, key: &K) -> Position {
        self.raw.position(self.raw.find(key, &self.cmp))
    }

    /// Returns `true` if the tree contains `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.raw.find(key, &self.cmp).is_some()
    }

    /// Returns the position of the greatest key that is less than or equal to `key`.
    #[must_use]
    pub fn find_lower(&self, key: &K) -> Position {
        self.raw.position(self.raw.find_lower(key, &self.cmp))
    }

    /// Returns the position of the least key that is greater than or equal to `key`.
    #[must_use]
    pub fn find_upper(&self, key: &K) -> Position {
        self.raw.position(self.raw.find_upper(key, &self.cmp))
    }

    /// Returns the position of the least key that is strictly greater than `key`.
    ///
    /// ```
    /// use avl_index::AvlTree;
    ///
    /// let tree: AvlTree<i32> = [10, 20].into_iter().map(|k| (k, ())).collect();
    /// assert_eq!(tree.key(tree.find_upper(&10)), Some(&10));
    /// assert_eq!(tree.key(tree.find_successor(&10)), Some(&20));
    /// assert!(tree.find_successor(&20).is_end());
    /// ```
    #[must_use]
    pub fn find_successor(&self, key: &K) -> Position {
        self.raw.position(self.raw.find_successor(key, &self.cmp))
    }

    /// Replaces the contents of the tree with a balanced tree built from `items`.
    ///
    /// The items are sorted (stably) and, where keys repeat, the first occurrence wins, the
    /// same outcome as inserting them one by one. Building this way skips the rebalancing
    /// work of repeated insertion. Every outstanding position becomes detached.
    ///
    /// ```
    /// use avl_index::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// tree.insert(99, 'z');
    /// tree.construct([(3, 'c'), (1, 'a'), (2, 'b'), (1, 'x')]);
    /// assert_eq!(tree.iter().collect::<Vec<_>>(), [(&1, &'a'), (&2, &'b'), (&3, &'c')]);
    /// assert_eq!(tree.height(), 2);
    /// ```
    pub fn construct<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut items: Vec<(K, V)> = items.into_iter().collect();
        items.sort_by(|a, b| self.cmp.compare(&a.0, &b.0));
        items.dedup_by(|later, earlier| !self.cmp.less(&earlier.0, &later.0));

        self.raw.clear();
        self.raw.build_sorted(items, &mut NoSummary);
        debug!(len = self.len(), height = self.height(), "constructed tree");
    }

    /// Gets an iterator over the entries with keys in `[low, high]`, in order.
    pub fn range(&self, low: &K, high: &K) -> Range<'_, K, V> {
        Range::new(&self.raw, self.raw.range_bounds(low, high, &self.cmp))
    }

    /// Appends the positions of every key in `[low, high]` to `out`, in ascending order.
    ///
    /// ```
    /// use avl_index::AvlTree;
    ///
    /// let tree: AvlTree<i32> = [2, 10, 3, 25, 12, 15, 45, 65, 100, 52].into_iter().map(|k| (k, ())).collect();
    /// let mut found = Vec::new();
    /// tree.range_query(&8, &45, &mut found);
    ///
    /// let keys: Vec<_> = found.into_iter().filter_map(|at| tree.key(at).copied()).collect();
    /// assert_eq!(keys, [10, 12, 15, 25, 45]);
    /// ```
    pub fn range_query<E>(&self, low: &K, high: &K, out: &mut E)
    where
        E: Extend<Position>,
    {
        let mut walk = Walk::new(self.raw.range_bounds(low, high, &self.cmp));
        let (nodes, _) = self.raw.parts();
        out.extend(core::iter::from_fn(|| walk.step_front(nodes)).map(|handle| self.raw.position(Some(handle))));
    }

    /// Returns a sink that inserts everything pushed into it.
    pub fn inserter(&mut self) -> Inserter<'_, K, V, C> {
        Inserter {
            tree: self,
            last: None,
        }
    }
}

impl<K, C: Comparator<K>> AvlTree<K, (), C> {
    /// Inserts a bare key into a set-like tree.
    pub fn insert_key(&mut self, key: K) -> Position {
        self.insert(key, ())
    }
}

impl<K, V, C: Comparator<K>> Inserter<'_, K, V, C> {
    /// Inserts `key` with `value` and returns the position of the element holding the key.
    pub fn push(&mut self, key: K, value: V) -> Position {
        let position = self.tree.insert(key, value);
        self.last = Some(position);
        position
    }

    /// Returns the position produced by the most recent push, if any.
    #[must_use]
    pub fn last(&self) -> Option<Position> {
        self.last
    }
}

impl<K, V, C: Comparator<K>> Extend<(K, V)> for Inserter<'_, K, V, C> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.push(key, value);
        }
    }
}

// ─── Trait implementations ───────────────────────────────────────────────────

impl<K: Clone, V: Clone, C: Clone> Clone for AvlTree<K, V, C> {
    /// Clones the tree. The clone has its own identity, so positions of one tree are
    /// foreign to the other.
    fn clone(&self) -> Self {
        AvlTree {
            raw: self.raw.clone(),
            cmp: self.cmp.clone(),
        }
    }
}

impl<K: PartialEq, V: PartialEq, C> PartialEq for AvlTree<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq, C> Eq for AvlTree<K, V, C> {}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for AvlTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C: Default> Default for AvlTree<K, V, C> {
    fn default() -> Self {
        AvlTree::with_comparator(C::default())
    }
}

impl<K, V, C: Comparator<K> + Default> FromIterator<(K, V)> for AvlTree<K, V, C> {
    /// Builds a balanced tree in one pass, as [`AvlTree::construct`] does.
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = AvlTree::default();
        tree.construct(iter);
        tree
    }
}

impl<K, V, C: Comparator<K>> Extend<(K, V)> for AvlTree<K, V, C> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a AvlTree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, C> IntoIterator for &'a mut AvlTree<K, V, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V, C> IntoIterator for AvlTree<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter::new(&mut self.raw)
    }
}

// ─── Iterators ───────────────────────────────────────────────────────────────

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new<S>(raw: &'a RawAvlTree<K, V, S>) -> Self {
        let (nodes, values) = raw.parts();
        Iter {
            nodes,
            values,
            walk: Walk::over(raw),
            remaining: raw.len(),
        }
    }

    fn entry(&self, handle: Handle) -> (&'a K, &'a V) {
        let node = self.nodes.get(handle);
        (node.key(), self.values.get(node.value()))
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.walk.step_front(self.nodes)?;
        self.remaining -= 1;
        Some(self.entry(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let handle = self.walk.step_back(self.nodes)?;
        self.remaining -= 1;
        Some(self.entry(handle))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes,
            values: self.values,
            walk: self.walk,
            remaining: self.remaining,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new<S>(raw: &'a mut RawAvlTree<K, V, S>) -> Self {
        let walk = Walk::over(raw);
        let remaining = raw.len();
        let (nodes, values) = raw.parts_mut();

        let mut slots: Vec<Option<&'a mut V>> = Vec::new();
        slots.resize_with(values.slot_count(), || None);
        for (handle, value) in values.iter_mut() {
            slots[handle.to_index()] = Some(value);
        }

        IterMut {
            nodes,
            values: slots,
            walk,
            remaining,
        }
    }

    fn entry(&mut self, handle: Handle) -> Option<(&'a K, &'a mut V)> {
        let node = self.nodes.get(handle);
        let value = self.values[node.value().to_index()].take()?;
        Some((node.key(), value))
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.walk.step_front(self.nodes)?;
        self.remaining -= 1;
        self.entry(handle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let handle = self.walk.step_back(self.nodes)?;
        self.remaining -= 1;
        self.entry(handle)
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new<S>(raw: &mut RawAvlTree<K, V, S>) -> Self {
        IntoIter {
            inner: raw.drain_sorted().into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Keys { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Values { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) fn new(inner: IterMut<'a, K, V>) -> Self {
        ValuesMut { inner }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

impl<'a, K, V> Range<'a, K, V> {
    pub(crate) fn new<S>(raw: &'a RawAvlTree<K, V, S>, bounds: Option<(Handle, Handle)>) -> Self {
        let (nodes, values) = raw.parts();
        Range {
            nodes,
            values,
            walk: Walk::new(bounds),
        }
    }

    fn entry(&self, handle: Handle) -> (&'a K, &'a V) {
        let node = self.nodes.get(handle);
        (node.key(), self.values.get(node.value()))
    }
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.walk.step_front(self.nodes)?;
        Some(self.entry(handle))
    }
}

impl<K, V> DoubleEndedIterator for Range<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let handle = self.walk.step_back(self.nodes)?;
        Some(self.entry(handle))
    }
}

impl<K, V> FusedIterator for Range<'_, K, V> {}

impl<K, V> Clone for Range<'_, K, V> {
    fn clone(&self) -> Self {
        Range {
            nodes: self.nodes,
            values: self.values,
            walk: self.walk,
        }
    }
}

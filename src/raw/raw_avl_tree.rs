use alloc::vec::Vec;
use core::cmp::Ordering;
use core::mem;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Node, Side};
use super::summary::Summarize;
use crate::compare::Comparator;
use crate::error::PositionError;
use crate::position::{NodeRef, Position, TreeId};

/// The AVL engine shared by every tree in the crate.
///
/// The engine is purely structural: it does not own a comparator or an augmentation
/// strategy. Callers pass both into each mutating operation, which lets a wrapper keep
/// them in fields that are disjoint from the tree (the range tree's hook, for example,
/// borrows an arena of associated structures next to the tree).
pub(crate) struct RawAvlTree<K, V, S = ()> {
    /// Identity stamped into every position this tree hands out.
    id: TreeId,
    /// Arena storing keys and links.
    nodes: Arena<Node<K>>,
    /// Arena storing values (kept apart so `IterMut` can borrow values while reading links).
    values: Arena<V>,
    /// Augmentation summaries, indexed by node handle.
    summaries: Vec<S>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
    /// Number of live nodes.
    len: usize,
}

impl<K, V, S> RawAvlTree<K, V, S> {
    /// Creates a new, empty tree.
    pub(crate) fn new() -> Self {
        Self {
            id: TreeId::fresh(),
            nodes: Arena::new(),
            values: Arena::new(),
            summaries: Vec::new(),
            root: None,
            len: 0,
        }
    }

    /// Creates a new tree with room for `capacity` elements.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            id: TreeId::fresh(),
            nodes: Arena::with_capacity(capacity),
            values: Arena::with_capacity(capacity),
            summaries: Vec::with_capacity(capacity),
            root: None,
            len: 0,
        }
    }

    pub(crate) const fn id(&self) -> TreeId {
        self.id
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn capacity(&self) -> usize {
        self.values.capacity()
    }

    pub(crate) const fn root(&self) -> Option<Handle> {
        self.root
    }

    /// Height of the tree; 0 when empty.
    pub(crate) fn height(&self) -> usize {
        usize::from(self.height_of(self.root))
    }

    /// Releases every node. Summaries are dropped, not released through a hook.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.values.clear();
        self.summaries.clear();
        self.root = None;
        self.len = 0;
    }

    /// Takes every summary out of the tree, leaving defaults behind.
    pub(crate) fn take_summaries(&mut self) -> Vec<S> {
        mem::take(&mut self.summaries)
    }

    #[inline]
    pub(crate) fn node(&self, handle: Handle) -> &Node<K> {
        self.nodes.get(handle)
    }

    #[inline]
    pub(crate) fn key(&self, handle: Handle) -> &K {
        self.nodes.get(handle).key()
    }

    #[inline]
    pub(crate) fn value(&self, handle: Handle) -> &V {
        self.values.get(self.nodes.get(handle).value())
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, handle: Handle) -> &mut V {
        let value = self.nodes.get(handle).value();
        self.values.get_mut(value)
    }

    #[inline]
    pub(crate) fn summary(&self, handle: Handle) -> &S {
        &self.summaries[handle.to_index()]
    }

    /// Splits the tree into its node arena and value arena, for iterators.
    pub(crate) fn parts(&self) -> (&Arena<Node<K>>, &Arena<V>) {
        (&self.nodes, &self.values)
    }

    /// Like [`parts`](Self::parts), with the values borrowed mutably.
    pub(crate) fn parts_mut(&mut self) -> (&Arena<Node<K>>, &mut Arena<V>) {
        (&self.nodes, &mut self.values)
    }

    pub(crate) fn first(&self) -> Option<Handle> {
        self.root.map(|root| leftmost(&self.nodes, root))
    }

    pub(crate) fn last(&self) -> Option<Handle> {
        self.root.map(|root| rightmost(&self.nodes, root))
    }

    pub(crate) fn successor(&self, handle: Handle) -> Option<Handle> {
        successor(&self.nodes, handle)
    }

    pub(crate) fn predecessor(&self, handle: Handle) -> Option<Handle> {
        predecessor(&self.nodes, handle)
    }

    /// Collects every element in order, emptying the tree.
    pub(crate) fn drain_sorted(&mut self) -> Vec<(K, V)> {
        let mut order = Vec::with_capacity(self.len);
        let mut current = self.first();
        while let Some(handle) = current {
            order.push(handle);
            current = self.successor(handle);
        }

        let result = order
            .into_iter()
            .map(|handle| {
                let node = self.nodes.take(handle);
                let value = self.values.take(node.value());
                (node.into_key(), value)
            })
            .collect();

        self.clear();
        result
    }

    // ─── Positions ───────────────────────────────────────────────────────────

    pub(crate) fn end(&self) -> Position {
        Position::end(self.id)
    }

    pub(crate) fn position(&self, handle: Option<Handle>) -> Position {
        match handle {
            None => Position::end(self.id),
            Some(handle) => Position::at(
                self.id,
                NodeRef {
                    handle,
                    generation: self.nodes.generation(handle),
                },
            ),
        }
    }

    /// Maps a position back to a node of this tree.
    ///
    /// `Ok(None)` is this tree's end sentinel.
    pub(crate) fn resolve(&self, position: Position) -> Result<Option<Handle>, PositionError> {
        if position.tree() != self.id {
            return Err(PositionError::ForeignTree {
                expected: self.id,
                found: position.tree(),
            });
        }

        match position.node() {
            None => Ok(None),
            Some(node) if self.nodes.contains(node.handle, node.generation) => Ok(Some(node.handle)),
            Some(_) => Err(PositionError::Detached),
        }
    }

    /// The node behind `position`, or `None` for the end sentinel and unusable positions.
    pub(crate) fn locate(&self, position: Position) -> Option<Handle> {
        self.resolve(position).ok().flatten()
    }

    pub(crate) fn next_position(&self, position: Position) -> Position {
        match self.locate(position) {
            Some(handle) => self.position(self.successor(handle)),
            None => self.end(),
        }
    }

    pub(crate) fn prev_position(&self, position: Position) -> Position {
        match self.resolve(position) {
            Ok(Some(handle)) => self.position(self.predecessor(handle)),
            // Stepping back from the end lands on the maximum.
            Ok(None) => self.position(self.last()),
            Err(_) => self.end(),
        }
    }

    /// Steps `steps` times forwards (or backwards when negative), saturating at the end.
    pub(crate) fn offset(&self, position: Position, steps: isize) -> Position {
        let mut current = position;
        if steps >= 0 {
            for _ in 0..steps {
                if current.is_end() {
                    break;
                }
                current = self.next_position(current);
            }
        } else {
            for step in 0..steps.unsigned_abs() {
                // Only the very first backward step may start from the end.
                if step > 0 && current.is_end() {
                    break;
                }
                current = self.prev_position(current);
            }
        }

        if self.resolve(current).is_ok() { current } else { self.end() }
    }

    // ─── Structural helpers ──────────────────────────────────────────────────

    #[inline]
    fn height_of(&self, handle: Option<Handle>) -> u8 {
        handle.map_or(0, |h| self.nodes.get(h).height())
    }

    fn balance_of(&self, handle: Handle) -> i16 {
        let node = self.nodes.get(handle);
        i16::from(self.height_of(node.left())) - i16::from(self.height_of(node.right()))
    }

    fn update_height(&mut self, handle: Handle) {
        let node = self.nodes.get(handle);
        let height = 1 + self.height_of(node.left()).max(self.height_of(node.right()));
        self.nodes.get_mut(handle).set_height(height);
    }

    /// Points `parent`'s link to `old` (or the root link) at `new`.
    fn replace_child(&mut self, parent: Option<Handle>, old: Handle, new: Option<Handle>) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let side = self.nodes.get(parent).side_of(old);
                self.nodes.get_mut(parent).set_child(side, new);
            }
        }
    }

    fn alloc_node(&mut self, key: K, value: V, parent: Option<Handle>) -> Handle
    where
        S: Default,
    {
        let value = self.values.alloc(value);
        let handle = self.nodes.alloc(Node::new(key, value, parent));
        let index = handle.to_index();
        if index >= self.summaries.len() {
            self.summaries.resize_with(index + 1, S::default);
        }
        self.len += 1;
        handle
    }
}

impl<K, V, S: Default> RawAvlTree<K, V, S> {
    // ─── Lookup ──────────────────────────────────────────────────────────────

    /// Finds `key`, or the empty link where it would be attached.
    fn search<C>(&self, key: &K, cmp: &C) -> Result<Handle, Option<(Handle, Side)>>
    where
        C: Comparator<K> + ?Sized,
    {
        let mut current = self.root;
        let mut slot = None;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            match cmp.compare(key, node.key()) {
                Ordering::Less => {
                    slot = Some((handle, Side::Left));
                    current = node.left();
                }
                Ordering::Greater => {
                    slot = Some((handle, Side::Right));
                    current = node.right();
                }
                Ordering::Equal => return Ok(handle),
            }
        }
        Err(slot)
    }

    pub(crate) fn find<C>(&self, key: &K, cmp: &C) -> Option<Handle>
    where
        C: Comparator<K> + ?Sized,
    {
        self.search(key, cmp).ok()
    }

    /// Greatest key that is not greater than `key`.
    pub(crate) fn find_lower<C>(&self, key: &K, cmp: &C) -> Option<Handle>
    where
        C: Comparator<K> + ?Sized,
    {
        let mut current = self.root;
        let mut best = None;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            if cmp.less(key, node.key()) {
                current = node.left();
            } else {
                best = Some(handle);
                if !cmp.less(node.key(), key) {
                    break;
                }
                current = node.right();
            }
        }
        best
    }

    /// Least key that is not less than `key`.
    pub(crate) fn find_upper<C>(&self, key: &K, cmp: &C) -> Option<Handle>
    where
        C: Comparator<K> + ?Sized,
    {
        let mut current = self.root;
        let mut best = None;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            if cmp.less(node.key(), key) {
                current = node.right();
            } else {
                best = Some(handle);
                if !cmp.less(key, node.key()) {
                    break;
                }
                current = node.left();
            }
        }
        best
    }

    /// Least key strictly greater than `key`.
    pub(crate) fn find_successor<C>(&self, key: &K, cmp: &C) -> Option<Handle>
    where
        C: Comparator<K> + ?Sized,
    {
        let mut current = self.root;
        let mut best = None;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            if cmp.less(key, node.key()) {
                best = Some(handle);
                current = node.left();
            } else {
                current = node.right();
            }
        }
        best
    }

    /// First and last node with a key in `[low, high]`, if any.
    pub(crate) fn range_bounds<C>(&self, low: &K, high: &K, cmp: &C) -> Option<(Handle, Handle)>
    where
        C: Comparator<K> + ?Sized,
    {
        let first = self.find_upper(low, cmp)?;
        let last = self.find_lower(high, cmp)?;
        if cmp.less(self.key(last), self.key(first)) {
            None
        } else {
            Some((first, last))
        }
    }

    // ─── Mutation ────────────────────────────────────────────────────────────

    /// Inserts `key` unless an equal key exists.
    ///
    /// Returns the node holding the key and whether it was newly created. When the key was
    /// already present the tree is unchanged and `key`/`value` are dropped.
    pub(crate) fn insert<C, H>(&mut self, key: K, value: V, cmp: &C, hook: &mut H) -> (Handle, bool)
    where
        C: Comparator<K> + ?Sized,
        H: Summarize<K, V, S>,
    {
        let slot = match self.search(&key, cmp) {
            Ok(existing) => return (existing, false),
            Err(slot) => slot,
        };

        let parent = slot.map(|(parent, _)| parent);
        let handle = self.alloc_node(key, value, parent);
        match slot {
            None => self.root = Some(handle),
            Some((parent, side)) => self.nodes.get_mut(parent).set_child(side, Some(handle)),
        }

        self.refresh(handle, hook);
        self.retrace(parent, hook);
        (handle, true)
    }

    /// Unlinks and frees `handle`, rebalancing its ancestors.
    ///
    /// A node with two children is replaced by relinking its in-order successor node into
    /// its place, so every other node keeps its handle.
    pub(crate) fn remove<H>(&mut self, handle: Handle, hook: &mut H) -> (K, V)
    where
        H: Summarize<K, V, S>,
    {
        let (parent, left, right, height) = {
            let node = self.nodes.get(handle);
            (node.parent(), node.left(), node.right(), node.height())
        };

        let retrace_from = if let (Some(left), Some(right)) = (left, right) {
            let successor = leftmost(&self.nodes, right);
            let retrace_from = if successor == right {
                successor
            } else {
                let successor_parent = self.nodes.get(successor).parent();
                let successor_right = self.nodes.get(successor).right();
                self.replace_child(successor_parent, successor, successor_right);
                if let Some(child) = successor_right {
                    self.nodes.get_mut(child).set_parent(successor_parent);
                }

                self.nodes.get_mut(successor).set_child(Side::Right, Some(right));
                self.nodes.get_mut(right).set_parent(Some(successor));
                successor_parent.expect("`RawAvlTree::remove()` - successor below `right` has no parent!")
            };

            self.replace_child(parent, handle, Some(successor));
            let moved = self.nodes.get_mut(successor);
            moved.set_parent(parent);
            moved.set_child(Side::Left, Some(left));
            moved.set_height(height);
            self.nodes.get_mut(left).set_parent(Some(successor));
            Some(retrace_from)
        } else {
            let child = left.or(right);
            self.replace_child(parent, handle, child);
            if let Some(child) = child {
                self.nodes.get_mut(child).set_parent(parent);
            }
            parent
        };

        let node = self.nodes.take(handle);
        let summary = mem::take(&mut self.summaries[handle.to_index()]);
        hook.release(summary);
        let value = self.values.take(node.value());
        self.len -= 1;

        self.retrace(retrace_from, hook);
        (node.into_key(), value)
    }

    /// Builds a perfectly balanced tree from items already sorted and free of duplicates.
    pub(crate) fn build_sorted<H>(&mut self, items: Vec<(K, V)>, hook: &mut H)
    where
        H: Summarize<K, V, S>,
    {
        assert!(self.is_empty(), "`RawAvlTree::build_sorted()` - tree is not empty!");
        let count = items.len();
        let mut items = items.into_iter();
        self.root = self.build_subtree(&mut items, count, None, hook);
    }

    fn build_subtree<I, H>(&mut self, items: &mut I, count: usize, parent: Option<Handle>, hook: &mut H) -> Option<Handle>
    where
        I: Iterator<Item = (K, V)>,
        H: Summarize<K, V, S>,
    {
        if count == 0 {
            return None;
        }

        let left_count = count / 2;
        let left = self.build_subtree(items, left_count, None, hook);
        let (key, value) = items.next().expect("`RawAvlTree::build_subtree()` - ran out of items!");
        let handle = self.alloc_node(key, value, parent);
        if let Some(left) = left {
            self.nodes.get_mut(left).set_parent(Some(handle));
        }
        self.nodes.get_mut(handle).set_child(Side::Left, left);

        let right = self.build_subtree(items, count - left_count - 1, Some(handle), hook);
        self.nodes.get_mut(handle).set_child(Side::Right, right);

        self.update_height(handle);
        self.refresh(handle, hook);
        Some(handle)
    }

    // ─── Balancing ───────────────────────────────────────────────────────────

    /// Recomputes the summary of `handle` from its children.
    fn refresh<H>(&mut self, handle: Handle, hook: &mut H)
    where
        H: Summarize<K, V, S>,
    {
        let node = self.nodes.get(handle);
        let left = node.left().map(|left| &self.summaries[left.to_index()]);
        let right = node.right().map(|right| &self.summaries[right.to_index()]);
        let summary = hook.summarize(handle, node.key(), self.values.get(node.value()), left, right);
        let previous = mem::replace(&mut self.summaries[handle.to_index()], summary);
        hook.release(previous);
    }

    /// Rotates `pivot` down towards `towards`; returns the node that took its place.
    fn rotate<H>(&mut self, pivot: Handle, towards: Side, hook: &mut H) -> Handle
    where
        H: Summarize<K, V, S>,
    {
        let rising_side = towards.opposite();
        let rising = self
            .nodes
            .get(pivot)
            .child(rising_side)
            .expect("`RawAvlTree::rotate()` - rotation needs a child on the rising side!");
        let inner = self.nodes.get(rising).child(towards);
        let parent = self.nodes.get(pivot).parent();

        self.nodes.get_mut(pivot).set_child(rising_side, inner);
        if let Some(inner) = inner {
            self.nodes.get_mut(inner).set_parent(Some(pivot));
        }

        self.replace_child(parent, pivot, Some(rising));
        self.nodes.get_mut(rising).set_parent(parent);
        self.nodes.get_mut(rising).set_child(towards, Some(pivot));
        self.nodes.get_mut(pivot).set_parent(Some(rising));

        self.update_height(pivot);
        self.update_height(rising);
        self.refresh(pivot, hook);
        self.refresh(rising, hook);
        rising
    }

    /// Restores the AVL invariant at `handle`; returns the root of the repaired subtree.
    fn rebalance<H>(&mut self, handle: Handle, hook: &mut H) -> Handle
    where
        H: Summarize<K, V, S>,
    {
        self.update_height(handle);
        let balance = self.balance_of(handle);

        if balance > 1 {
            let left = self.nodes.get(handle).left().expect("`RawAvlTree::rebalance()` - left-heavy without left child!");
            if self.balance_of(left) < 0 {
                self.rotate(left, Side::Left, hook);
            }
            self.rotate(handle, Side::Right, hook)
        } else if balance < -1 {
            let right =
                self.nodes.get(handle).right().expect("`RawAvlTree::rebalance()` - right-heavy without right child!");
            if self.balance_of(right) > 0 {
                self.rotate(right, Side::Right, hook);
            }
            self.rotate(handle, Side::Left, hook)
        } else {
            self.refresh(handle, hook);
            handle
        }
    }

    /// Walks from `from` to the root, rebalancing and refreshing every node on the way.
    fn retrace<H>(&mut self, from: Option<Handle>, hook: &mut H)
    where
        H: Summarize<K, V, S>,
    {
        let mut current = from;
        while let Some(handle) = current {
            let top = self.rebalance(handle, hook);
            current = self.nodes.get(top).parent();
        }
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for RawAvlTree<K, V, S> {
    /// Clones the structure; the clone is a distinct tree with its own id.
    fn clone(&self) -> Self {
        Self {
            id: TreeId::fresh(),
            nodes: self.nodes.clone(),
            values: self.values.clone(),
            summaries: self.summaries.clone(),
            root: self.root,
            len: self.len,
        }
    }
}

// ─── Navigation over a node arena ────────────────────────────────────────────
//
// Free functions so that iterators holding only `&Arena<Node<K>>` can share them.

pub(crate) fn leftmost<K>(nodes: &Arena<Node<K>>, mut handle: Handle) -> Handle {
    while let Some(left) = nodes.get(handle).left() {
        handle = left;
    }
    handle
}

pub(crate) fn rightmost<K>(nodes: &Arena<Node<K>>, mut handle: Handle) -> Handle {
    while let Some(right) = nodes.get(handle).right() {
        handle = right;
    }
    handle
}

pub(crate) fn successor<K>(nodes: &Arena<Node<K>>, handle: Handle) -> Option<Handle> {
    if let Some(right) = nodes.get(handle).right() {
        return Some(leftmost(nodes, right));
    }

    let mut child = handle;
    let mut parent = nodes.get(handle).parent();
    while let Some(p) = parent {
        if nodes.get(p).left() == Some(child) {
            return Some(p);
        }
        child = p;
        parent = nodes.get(p).parent();
    }
    None
}

pub(crate) fn predecessor<K>(nodes: &Arena<Node<K>>, handle: Handle) -> Option<Handle> {
    if let Some(left) = nodes.get(handle).left() {
        return Some(rightmost(nodes, left));
    }

    let mut child = handle;
    let mut parent = nodes.get(handle).parent();
    while let Some(p) = parent {
        if nodes.get(p).right() == Some(child) {
            return Some(p);
        }
        child = p;
        parent = nodes.get(p).parent();
    }
    None
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::uninlined_format_args, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use crate::compare::NaturalOrder;
    use crate::raw::summary::NoSummary;
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use alloc::vec;
    use proptest::prelude::*;

    /// Summary hook counting subtree sizes, used to check that summaries are refreshed on
    /// every structural change.
    struct CountHook;

    impl<K, V> Summarize<K, V, usize> for CountHook {
        fn summarize(&mut self, _node: Handle, _key: &K, _value: &V, left: Option<&usize>, right: Option<&usize>) -> usize {
            1 + left.copied().unwrap_or(0) + right.copied().unwrap_or(0)
        }
    }

    impl<K: Ord, V, S> RawAvlTree<K, V, S> {
        /// Validates all AVL invariants. Panics with a descriptive message if any are violated.
        pub(crate) fn validate_invariants(&self) {
            let mut errors: Vec<String> = Vec::new();

            match self.root {
                None => {
                    if self.len != 0 {
                        errors.push(alloc::format!("empty tree has len {}", self.len));
                    }
                }
                Some(root) => {
                    if self.nodes.get(root).parent().is_some() {
                        errors.push(String::from("root has a parent"));
                    }
                    let (count, _) = self.validate_node(root, None, None, &mut errors);
                    if count != self.len {
                        errors.push(alloc::format!("len mismatch: self.len={}, actual count={}", self.len, count));
                    }
                }
            }

            if self.nodes.len() != self.len || self.values.len() != self.len {
                errors.push(alloc::format!(
                    "arena mismatch: len={}, nodes={}, values={}",
                    self.len,
                    self.nodes.len(),
                    self.values.len()
                ));
            }

            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        // Returns (node count, height) of the subtree.
        fn validate_node(&self, handle: Handle, low: Option<&K>, high: Option<&K>, errors: &mut Vec<String>) -> (usize, u8) {
            let node = self.nodes.get(handle);
            if low.is_some_and(|low| node.key() <= low) || high.is_some_and(|high| node.key() >= high) {
                errors.push(alloc::format!("ordering violated at {:?}", handle));
            }

            let mut count = 1;
            let mut heights = [0u8; 2];
            for (i, child) in [node.left(), node.right()].into_iter().enumerate() {
                let Some(child) = child else { continue };
                if self.nodes.get(child).parent() != Some(handle) {
                    errors.push(alloc::format!("parent link of {:?} does not point at {:?}", child, handle));
                }
                let (lo, hi) = if i == 0 { (low, Some(node.key())) } else { (Some(node.key()), high) };
                let (child_count, child_height) = self.validate_node(child, lo, hi, errors);
                count += child_count;
                heights[i] = child_height;
            }

            let height = 1 + heights[0].max(heights[1]);
            if node.height() != height {
                errors.push(alloc::format!("stored height {} != actual {} at {:?}", node.height(), height, handle));
            }
            if (i16::from(heights[0]) - i16::from(heights[1])).abs() > 1 {
                errors.push(alloc::format!("unbalanced at {:?}: {} vs {}", handle, heights[0], heights[1]));
            }
            (count, height)
        }

        fn in_order_keys(&self) -> Vec<&K> {
            let mut keys = Vec::new();
            let mut current = self.first();
            while let Some(handle) = current {
                keys.push(self.key(handle));
                current = self.successor(handle);
            }
            keys
        }
    }

    impl<K: Ord, V> RawAvlTree<K, V, usize> {
        fn validate_counts(&self) {
            let mut current = self.first();
            while let Some(handle) = current {
                let node = self.nodes.get(handle);
                let expected = 1
                    + node.left().map_or(0, |l| *self.summary(l))
                    + node.right().map_or(0, |r| *self.summary(r));
                assert_eq!(*self.summary(handle), expected, "stale summary at {:?}", handle);
                current = self.successor(handle);
            }
            if let Some(root) = self.root {
                assert_eq!(*self.summary(root), self.len);
            }
        }
    }

    #[test]
    fn sequential_inserts_stay_balanced() {
        let mut tree: RawAvlTree<i32, ()> = RawAvlTree::new();
        for key in 0..1024 {
            tree.insert(key, (), &NaturalOrder, &mut NoSummary);
        }
        tree.validate_invariants();
        assert_eq!(tree.len(), 1024);
        // A perfect tree of 1024 nodes has height 11; AVL allows up to ~1.44 log2(n).
        assert!(tree.height() <= 14, "height {}", tree.height());
    }

    #[test]
    fn duplicate_insert_returns_existing_node() {
        let mut tree: RawAvlTree<i32, &str> = RawAvlTree::new();
        let (first, created) = tree.insert(7, "first", &NaturalOrder, &mut NoSummary);
        assert!(created);
        let (second, created) = tree.insert(7, "second", &NaturalOrder, &mut NoSummary);
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(*tree.value(first), "first");
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn remove_keeps_other_handles_stable() {
        let mut tree: RawAvlTree<i32, i32> = RawAvlTree::new();
        let handles: Vec<Handle> = (0..64).map(|k| tree.insert(k, k * 10, &NaturalOrder, &mut NoSummary).0).collect();

        // Removing nodes with two children relinks the successor instead of moving its key.
        for key in (0..64).step_by(3) {
            let handle = tree.find(&key, &NaturalOrder).unwrap();
            assert_eq!(tree.remove(handle, &mut NoSummary), (key, key * 10));
            tree.validate_invariants();
        }

        for (key, handle) in handles.iter().enumerate() {
            let key = key as i32;
            if key % 3 != 0 {
                assert_eq!(*tree.key(*handle), key);
                assert_eq!(*tree.value(*handle), key * 10);
            }
        }
    }

    #[test]
    fn bounds_lookups() {
        let mut tree: RawAvlTree<i32, ()> = RawAvlTree::new();
        for key in [3, 5, 9] {
            tree.insert(key, (), &NaturalOrder, &mut NoSummary);
        }
        let key_of = |h: Option<Handle>| h.map(|h| *tree.key(h));

        assert_eq!(key_of(tree.find_lower(&2, &NaturalOrder)), None);
        assert_eq!(key_of(tree.find_lower(&4, &NaturalOrder)), Some(3));
        assert_eq!(key_of(tree.find_lower(&9, &NaturalOrder)), Some(9));
        assert_eq!(key_of(tree.find_upper(&5, &NaturalOrder)), Some(5));
        assert_eq!(key_of(tree.find_upper(&6, &NaturalOrder)), Some(9));
        assert_eq!(key_of(tree.find_upper(&10, &NaturalOrder)), None);
        assert_eq!(key_of(tree.find_successor(&5, &NaturalOrder)), Some(9));
        assert_eq!(key_of(tree.find_successor(&9, &NaturalOrder)), None);
        assert_eq!(tree.range_bounds(&6, &8, &NaturalOrder), None);
    }

    #[test]
    fn build_sorted_is_balanced_and_summarized() {
        for count in [0usize, 1, 2, 3, 7, 8, 100, 1000] {
            let mut tree: RawAvlTree<usize, (), usize> = RawAvlTree::new();
            tree.build_sorted((0..count).map(|k| (k, ())).collect(), &mut CountHook);
            tree.validate_invariants();
            tree.validate_counts();
            assert_eq!(tree.len(), count);
            let expected_height = if count == 0 { 0 } else { (usize::BITS - count.leading_zeros()) as usize };
            assert_eq!(tree.height(), expected_height, "count {}", count);
        }
    }

    #[test]
    fn drain_sorted_empties_in_order() {
        let mut tree: RawAvlTree<i32, char> = RawAvlTree::new();
        for (key, value) in [(3, 'c'), (1, 'a'), (2, 'b')] {
            tree.insert(key, value, &NaturalOrder, &mut NoSummary);
        }
        assert_eq!(tree.drain_sorted(), vec![(1, 'a'), (2, 'b'), (3, 'c')]);
        assert!(tree.is_empty());
        tree.validate_invariants();
    }

    #[test]
    fn positions_detect_foreign_and_detached() {
        let mut tree: RawAvlTree<i32, ()> = RawAvlTree::new();
        let other: RawAvlTree<i32, ()> = RawAvlTree::new();
        let (handle, _) = tree.insert(1, (), &NaturalOrder, &mut NoSummary);
        let position = tree.position(Some(handle));

        assert_eq!(tree.resolve(position), Ok(Some(handle)));
        assert_eq!(
            other.resolve(position),
            Err(PositionError::ForeignTree {
                expected: other.id(),
                found: tree.id()
            })
        );

        tree.remove(handle, &mut NoSummary);
        assert_eq!(tree.resolve(position), Err(PositionError::Detached));

        // The slot is reused by the next insert but the old position stays detached.
        let (reused, _) = tree.insert(2, (), &NaturalOrder, &mut NoSummary);
        assert_eq!(reused, handle);
        assert_eq!(tree.resolve(position), Err(PositionError::Detached));
    }

    #[test]
    fn clear_detaches_positions() {
        let mut tree: RawAvlTree<i32, ()> = RawAvlTree::new();
        let (handle, _) = tree.insert(1, (), &NaturalOrder, &mut NoSummary);
        let position = tree.position(Some(handle));
        tree.clear();
        tree.insert(1, (), &NaturalOrder, &mut NoSummary);
        assert_eq!(tree.resolve(position), Err(PositionError::Detached));
    }

    #[test]
    fn offsets_saturate_at_end() {
        let mut tree: RawAvlTree<i32, ()> = RawAvlTree::new();
        for key in 1..=3 {
            tree.insert(key, (), &NaturalOrder, &mut NoSummary);
        }
        let key_at = |p: Position| tree.locate(p).map(|h| *tree.key(h));
        let end = tree.end();
        let first = tree.position(tree.first());

        assert_eq!(key_at(tree.offset(end, -1)), Some(3));
        assert_eq!(key_at(tree.offset(end, -3)), Some(1));
        assert!(tree.offset(end, -4).is_end());
        assert!(tree.offset(end, -40).is_end());
        assert!(tree.offset(end, 2).is_end());
        assert_eq!(key_at(tree.offset(first, 2)), Some(3));
        assert!(tree.offset(first, 3).is_end());
        assert!(tree.offset(first, -1).is_end());
        assert_eq!(key_at(tree.offset(first, 0)), Some(1));
    }

    #[test]
    fn clone_gets_new_identity() {
        let mut tree: RawAvlTree<i32, i32> = RawAvlTree::new();
        let (handle, _) = tree.insert(1, 10, &NaturalOrder, &mut NoSummary);
        let copy = tree.clone();
        assert_ne!(copy.id(), tree.id());
        assert!(copy.resolve(tree.position(Some(handle))).is_err());
        assert_eq!(*copy.value(handle), 10);
        copy.validate_invariants();
    }

    // ─── Randomized model checks ─────────────────────────────────────────────

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i16),
        Remove(i16),
        RemoveNth(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => (-200i16..200).prop_map(Op::Insert),
            3 => (-200i16..200).prop_map(Op::Remove),
            1 => any::<usize>().prop_map(Op::RemoveNth),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn ops_match_btreemap(ops in prop::collection::vec(op_strategy(), 0..400)) {
            let mut tree: RawAvlTree<i16, i32, usize> = RawAvlTree::new();
            let mut model: BTreeMap<i16, i32> = BTreeMap::new();

            for (step, op) in ops.into_iter().enumerate() {
                let step = step as i32;
                match op {
                    Op::Insert(key) => {
                        let (handle, created) = tree.insert(key, step, &NaturalOrder, &mut CountHook);
                        let was_absent = !model.contains_key(&key);
                        model.entry(key).or_insert(step);
                        prop_assert_eq!(created, was_absent);
                        prop_assert_eq!(*tree.key(handle), key);
                    }
                    Op::Remove(key) => {
                        let removed = tree.find(&key, &NaturalOrder).map(|h| tree.remove(h, &mut CountHook));
                        prop_assert_eq!(removed, model.remove_entry(&key));
                    }
                    Op::RemoveNth(n) => {
                        if model.is_empty() {
                            continue;
                        }
                        let key = *model.keys().nth(n % model.len()).unwrap();
                        let handle = tree.find(&key, &NaturalOrder).unwrap();
                        prop_assert_eq!(tree.remove(handle, &mut CountHook), model.remove_entry(&key).unwrap());
                    }
                }

                tree.validate_invariants();
                tree.validate_counts();
            }

            let keys: Vec<i16> = tree.in_order_keys().into_iter().copied().collect();
            let expected: Vec<i16> = model.keys().copied().collect();
            prop_assert_eq!(keys, expected);
        }

        #[test]
        fn predecessor_mirrors_successor(keys in prop::collection::btree_set(any::<i32>(), 0..200)) {
            let mut tree: RawAvlTree<i32, ()> = RawAvlTree::new();
            for &key in &keys {
                tree.insert(key, (), &NaturalOrder, &mut NoSummary);
            }

            let mut backwards = Vec::new();
            let mut current = tree.last();
            while let Some(handle) = current {
                backwards.push(*tree.key(handle));
                current = tree.predecessor(handle);
            }
            backwards.reverse();
            prop_assert_eq!(backwards, keys.into_iter().collect::<Vec<_>>());
        }
    }
}

//! Detached cursors into a tree.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::raw::Handle;

/// Identity of one tree instance.
///
/// Every tree (including every clone of a tree) draws a fresh id when it is created. A
/// [`Position`] remembers the id of the tree that produced it so that handing it to another
/// tree can be detected.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TreeId(u64);

impl TreeId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        TreeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree#{}", self.0)
    }
}

/// A position in a tree: either an element or the end sentinel.
///
/// Positions are plain `Copy` values that do not borrow the tree, the way an iterator of a
/// node-based C++ container outlives unrelated insertions and erasures. They are moved with
/// `next`/`prev`/`offset` on the owning tree and dereferenced with its `key`/`value`/
/// `value_mut`/`get` accessors.
///
/// A position keeps pointing at the same element until that element is erased, after which
/// it is *detached*: accessors return `None` and `erase_at` fails with
/// [`PositionError::Detached`](crate::PositionError::Detached).
///
/// # Examples
///
/// ```
/// use avl_index::AvlTree;
///
/// let mut tree: AvlTree<i32, &str> = AvlTree::new();
/// let two = tree.insert(2, "two");
/// tree.insert(1, "one");
/// tree.insert(3, "three");
///
/// assert_eq!(tree.key(two), Some(&2));
/// assert_eq!(tree.key(tree.next(two)), Some(&3));
/// assert!(tree.next(tree.next(two)).is_end());
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Position {
    tree: TreeId,
    node: Option<NodeRef>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) struct NodeRef {
    pub(crate) handle: Handle,
    pub(crate) generation: u32,
}

impl Position {
    #[inline]
    pub(crate) const fn end(tree: TreeId) -> Self {
        Position { tree, node: None }
    }

    #[inline]
    pub(crate) const fn at(tree: TreeId, node: NodeRef) -> Self {
        Position { tree, node: Some(node) }
    }

    #[inline]
    pub(crate) const fn node(&self) -> Option<NodeRef> {
        self.node
    }

    /// Returns true if this is the end sentinel.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Returns the id of the tree this position belongs to.
    #[must_use]
    pub const fn tree(&self) -> TreeId {
        self.tree
    }
}

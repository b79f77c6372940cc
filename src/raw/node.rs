use super::handle::Handle;

/// A binary tree node living in the node arena.
///
/// The value sits in a separate arena (see `RawAvlTree`), and the augmentation summary in a
/// vector indexed by this node's handle, so a `Node` only carries what the structural
/// algorithms touch.
#[derive(Clone, Debug)]
pub(crate) struct Node<K> {
    key: K,
    value: Handle,
    // Non-owning back link; `None` at the root.
    parent: Option<Handle>,
    left: Option<Handle>,
    right: Option<Handle>,
    // Height of the subtree rooted here, a leaf has height 1.
    height: u8,
}

impl<K> Node<K> {
    pub(crate) const fn new(key: K, value: Handle, parent: Option<Handle>) -> Self {
        Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 1,
        }
    }

    #[inline]
    pub(crate) const fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub(crate) const fn value(&self) -> Handle {
        self.value
    }

    #[inline]
    pub(crate) const fn parent(&self) -> Option<Handle> {
        self.parent
    }

    #[inline]
    pub(crate) const fn left(&self) -> Option<Handle> {
        self.left
    }

    #[inline]
    pub(crate) const fn right(&self) -> Option<Handle> {
        self.right
    }

    #[inline]
    pub(crate) const fn height(&self) -> u8 {
        self.height
    }

    #[inline]
    pub(crate) const fn child(&self, side: Side) -> Option<Handle> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        self.parent = parent;
    }

    #[inline]
    pub(crate) fn set_child(&mut self, side: Side, child: Option<Handle>) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }

    #[inline]
    pub(crate) fn set_height(&mut self, height: u8) {
        self.height = height;
    }

    /// Which side of this node `child` hangs on. Panics if it is not a child.
    pub(crate) fn side_of(&self, child: Handle) -> Side {
        if self.left == Some(child) {
            Side::Left
        } else {
            assert_eq!(self.right, Some(child), "`Node::side_of()` - `child` is not a child of this node!");
            Side::Right
        }
    }

    pub(crate) fn into_key(self) -> K {
        self.key
    }
}

/// One of the two child slots of a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub(crate) const fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn new_node_is_a_leaf() {
        let node = Node::new("k", Handle::from_index(3), Some(Handle::from_index(1)));
        assert_eq!(*node.key(), "k");
        assert_eq!(node.value(), Handle::from_index(3));
        assert_eq!(node.parent(), Some(Handle::from_index(1)));
        assert_eq!(node.left(), None);
        assert_eq!(node.right(), None);
        assert_eq!(node.height(), 1);
    }

    #[test]
    fn children_by_side() {
        let mut node = Node::new(0u8, Handle::from_index(0), None);
        node.set_child(Side::Left, Some(Handle::from_index(5)));
        node.set_child(Side::Right, Some(Handle::from_index(6)));
        assert_eq!(node.child(Side::Left), Some(Handle::from_index(5)));
        assert_eq!(node.side_of(Handle::from_index(6)), Side::Right);
        assert_eq!(Side::Left.opposite(), Side::Right);
    }

    #[test]
    #[should_panic(expected = "`Node::side_of()` - `child` is not a child of this node!")]
    fn side_of_stranger_panics() {
        let node = Node::new(0u8, Handle::from_index(0), None);
        let _ = node.side_of(Handle::from_index(9));
    }
}

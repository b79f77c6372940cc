mod arena;
mod handle;
mod node;
mod raw_avl_tree;
mod summary;

pub(crate) use arena::Arena;
pub(crate) use handle::Handle;
pub(crate) use node::Node;
pub(crate) use raw_avl_tree::{RawAvlTree, predecessor, successor};
pub(crate) use summary::{NoSummary, Summarize};

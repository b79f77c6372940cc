//! Balanced ordered indexes for Rust: an AVL tree with stable cursors, an interval /
//! bounding-box overlap tree, and a multidimensional range tree.
//!
//! - [`AvlTree`] - an ordered map/set with [`Position`] cursors that survive unrelated
//!   insertions and erasures, bound queries, offsets and erase-and-advance
//! - [`OverlapTree`] - objects indexed by their axis-aligned bounding box; reports every
//!   object whose box overlaps a query box, optionally refined by an exact predicate
//! - [`RangeTree`] - points indexed over any number of dimensions; reports every point
//!   inside an axis-aligned query box
//!
//! # Example
//!
//! ```
//! use avl_index::AvlTree;
//!
//! let mut tree = AvlTree::new();
//! for key in [2, 10, 3, 25, 12, 15, 45, 65, 100, 52] {
//!     tree.insert(key, key * 10);
//! }
//!
//! // Bound queries return positions; the end sentinel means "none".
//! let at = tree.find_lower(&11);
//! assert_eq!(tree.get(at), Some((&10, &100)));
//! assert!(tree.find_upper(&101).is_end());
//!
//! // Positions can be stepped, dereferenced and used to erase while walking.
//! let next = tree.erase_at(at).unwrap();
//! assert_eq!(tree.key(next), Some(&12));
//! assert_eq!(tree.len(), 9);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Injected ordering** - every tree takes its comparators as values (see [`Comparator`])
//! - **Stable positions** - nodes live in a generational arena, so a position to an erased
//!   element is detected instead of silently aliasing a new one
//!
//! # Implementation
//!
//! All three trees share one AVL engine. Nodes, values and per-node augmentation live in
//! separate arenas linked by 32-bit handles, with non-owning parent links for cursor
//! movement. The overlap tree augments every node with the bounding box of its subtree;
//! the range tree augments every node with a handle to an associated tree over its subtree,
//! ordered by the next dimension.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod raw;

pub mod avl_tree;
pub mod compare;
pub mod error;
pub mod overlap_tree;
pub mod position;
pub mod range_tree;

pub use avl_tree::{AvlTree, Inserter};
pub use compare::{Comparator, NaturalOrder};
pub use error::PositionError;
pub use overlap_tree::{Aabb, BoundKind, Extractor, OverlapTree};
pub use position::{Position, TreeId};
pub use range_tree::{AxisOrder, Coordinates, RangeTree};

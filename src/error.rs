//! Errors reported to callers.

use core::fmt;

use crate::position::TreeId;

/// Reasons a [`Position`](crate::Position) cannot be used to erase an element.
///
/// This is the only failure the trees surface: lookups that find nothing return the end
/// sentinel, and queries on empty trees produce empty results.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PositionError {
    /// The position was produced by a different tree.
    ForeignTree {
        /// The tree the operation was called on.
        expected: TreeId,
        /// The tree that produced the position.
        found: TreeId,
    },
    /// The element the position referred to has already been erased.
    Detached,
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionError::ForeignTree { expected, found } => {
                write!(f, "position belongs to {found}, not to {expected}")
            }
            PositionError::Detached => write!(f, "position refers to an element that was erased"),
        }
    }
}

impl core::error::Error for PositionError {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn messages_name_both_trees() {
        let expected = TreeId::fresh();
        let found = TreeId::fresh();
        let message = PositionError::ForeignTree { expected, found }.to_string();
        assert!(message.contains(&found.to_string()));
        assert!(message.contains(&expected.to_string()));
        assert_eq!(PositionError::Detached.to_string(), "position refers to an element that was erased");
    }
}

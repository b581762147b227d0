//! Error taxonomy.
//!
//! Tree-structure errors are fatal to the whole root: the caller tears the
//! terminal down (leave alternate screen, disable mouse reporting) before
//! propagating, so the host shell is never left in a corrupted mode.
//! Layout and output errors abort only the current render pass. Geometry
//! drift and unrecognized style values are recovered locally and never
//! reach this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReefError {
    /// Handle does not refer to a live node. Handle 0 is permanently invalid.
    #[error("invalid handle: {0}")]
    InvalidHandle(u32),

    /// Attempted to remove a node that is not a current child of the parent.
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: u32, child: u32 },

    /// A node kind that cannot have children was given one.
    #[error("node {parent} ({kind}) cannot have children")]
    NotAContainer { parent: u32, kind: &'static str },

    /// No root element has been set.
    #[error("no root set")]
    NoRoot,

    /// The external layout solver rejected the tree.
    #[error("layout solve failed: {0}")]
    Layout(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReefError {
    /// Whether this error poisons the whole root (invalid tree operations)
    /// as opposed to aborting a single render pass.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReefError::InvalidHandle(_)
                | ReefError::NotAChild { .. }
                | ReefError::NotAContainer { .. }
                | ReefError::NoRoot
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ReefError::InvalidHandle(7).is_fatal());
        assert!(ReefError::NotAChild { parent: 1, child: 2 }.is_fatal());
        assert!(!ReefError::Layout("overflow".into()).is_fatal());
        assert!(!ReefError::Io(std::io::Error::other("pipe")).is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let e = ReefError::NotAChild { parent: 3, child: 9 };
        assert_eq!(e.to_string(), "node 9 is not a child of 3");
        assert_eq!(ReefError::InvalidHandle(0).to_string(), "invalid handle: 0");
    }
}

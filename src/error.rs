use thiserror::Error;

/// Contract violations reported by [`FingerTree`] operations.
///
/// A rejected operation leaves the tree it was called on unchanged.
///
/// [`FingerTree`]: crate::FingerTree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("key is already present in the tree")]
    DuplicateKey,
    #[error("handle does not name a node of this tree")]
    NodeNotFound,
    #[error("pivot key does not separate the key ranges of the joined trees")]
    KeyOrder,
}

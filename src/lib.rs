//! An AVL tree with a finger on its maximum.
//!
//! [`FingerTree`] is an ordered dictionary that caches its maximum-key
//! vertex. Searches and insertions can start from that finger, which makes
//! workloads with keys clustered near the top of the range cheap. Two trees
//! separated by a pivot key join in time proportional to their height
//! difference, and a tree splits at any of its vertices in logarithmic time.
//!
//! Insertions report the work they did (edges walked, promotes, rotations)
//! so insertion-order experiments can be run against the tree.
//!
//! ```
//! use finger_avl::FingerTree;
//!
//! let mut tree = FingerTree::new();
//! for key in 1..=7 {
//!     let inserted = tree.finger_insert(key, key.to_string()).unwrap();
//!     assert!(inserted.edges <= 1);
//! }
//! let node = tree.search(&4).node.unwrap().handle();
//! let split = tree.split(node).unwrap();
//! assert_eq!(split.left.len(), 3);
//! assert_eq!(split.right.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [5, 6, 7]);
//! ```

mod error;
mod iter;
mod node;
mod tree;

pub use error::TreeError;
pub use iter::Iter;
pub use node::{Handle, NodeRef};
pub use tree::{FingerTree, Inserted, Search, Split};

#[cfg(test)]
mod model;

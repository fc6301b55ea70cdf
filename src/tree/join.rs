use std::mem;

use tracing::{debug, trace};

use super::FingerTree;
use crate::error::TreeError;
use crate::node::{Handle, Link, Node, NodePtr};

/// The two halves produced by [`FingerTree::split`], with the entry of the
/// vertex the tree was split at.
#[derive(Debug)]
pub struct Split<K, V> {
    /// Every key smaller than `key`.
    pub left: FingerTree<K, V>,
    pub key: K,
    pub value: V,
    /// Every key greater than `key`.
    pub right: FingerTree<K, V>,
}

impl<K: Ord, V> FingerTree<K, V> {
    /// Merges `other` and a new pivot entry into `self`.
    ///
    /// All keys of one tree must be smaller than `key` and all keys of the
    /// other greater; either tree may be the smaller one. Runs in time
    /// proportional to the height difference of the two trees, plus the
    /// logarithmic range check. On [`TreeError::KeyOrder`] `self` is left
    /// unchanged and `other` is dropped.
    pub fn join(&mut self, other: Self, key: K, value: V) -> Result<Handle<K, V>, TreeError>
    where
        K: Clone,
    {
        let self_is_low = match Self::separated_by(self, &other, &key) {
            Some(self_is_low) => self_is_low,
            None => {
                debug!(
                    len = self.num_nodes,
                    other_len = other.num_nodes,
                    "join rejected, pivot does not separate the trees"
                );
                return Err(TreeError::KeyOrder);
            }
        };

        let this = mem::take(self);
        let (low, high) = if self_is_low {
            (this, other)
        } else {
            (other, this)
        };
        let pivot_ptr = Node::create(Link::Virtual, key, value);
        let handle = Handle::new(pivot_ptr);
        *self = Self::join_with(low, pivot_ptr, high);
        Ok(handle)
    }

    /// Splits the tree at the vertex named by `node`.
    ///
    /// Walks from the vertex up to the root, joining each ancestor and its
    /// other subtree onto the matching half. The tree is consumed; on
    /// [`TreeError::NodeNotFound`] it is dropped.
    pub fn split(self, node: Handle<K, V>) -> Result<Split<K, V>, TreeError> {
        let node_ptr = self.locate(&node)?;
        let num_nodes = self.num_nodes;
        // Vertices are now owned by the split loop below
        let _ = self.into_root();

        let (mut left, mut right, mut parent) = unsafe {
            let node = node_ptr.as_ref();
            (
                Self::detach(node.left),
                Self::detach(node.right),
                node.parent,
            )
        };
        let mut current = node_ptr;
        let mut levels = 0;
        while let Link::Real(parent_ptr) = parent {
            let (from_left, sibling, grandparent) = unsafe {
                let parent = parent_ptr.as_ref();
                if parent.left == Link::Real(current) {
                    (true, parent.right, parent.parent)
                } else {
                    (false, parent.left, parent.parent)
                }
            };
            let sibling = Self::detach(sibling);
            if from_left {
                right = Self::join_with(right, parent_ptr, sibling);
            } else {
                left = Self::join_with(sibling, parent_ptr, left);
            }
            current = parent_ptr;
            parent = grandparent;
            levels += 1;
        }

        // Pieces were detached without counts or maxima; settle both now.
        left.num_nodes = left.root.count();
        right.num_nodes = num_nodes - 1 - left.num_nodes;
        left.update_max();
        right.update_max();
        trace!(levels, left = left.num_nodes, right = right.num_nodes, "split");

        let (key, value) = unsafe { Node::destroy(node_ptr) };
        Ok(Split {
            left,
            key,
            value,
            right,
        })
    }

    /// Returns `Some(true)` if `pivot` lies above every key of `a` and below
    /// every key of `b`, `Some(false)` for the opposite arrangement, `None`
    /// if it separates them in neither direction.
    fn separated_by(a: &Self, b: &Self, pivot: &K) -> Option<bool> {
        let below = |tree: &Self| tree.max().map_or(true, |node| node.key() < pivot);
        let above = |tree: &Self| tree.min().map_or(true, |node| node.key() > pivot);
        if below(a) && above(b) {
            Some(true)
        } else if above(a) && below(b) {
            Some(false)
        } else {
            None
        }
    }
}

impl<K, V> FingerTree<K, V> {
    /// Joins `low`, the detached vertex `pivot_ptr` and `high`, where every
    /// key of `low` is below the pivot and every key of `high` above it.
    /// The result's maximum is taken from `high`'s cache, or is the pivot
    /// when `high` is empty.
    ///
    /// The shorter tree hangs next to the pivot, which is spliced into the
    /// taller tree's facing spine at the first vertex no taller than the
    /// shorter tree. The splice can only unbalance ancestors by two.
    fn join_with(low: Self, pivot_ptr: NodePtr<K, V>, high: Self) -> Self {
        let num_nodes = low.num_nodes + high.num_nodes + 1;
        let max = if high.max.is_real() {
            high.max
        } else {
            Link::Real(pivot_ptr)
        };
        let low_root = low.into_root();
        let high_root = high.into_root();
        let (low_height, high_height) = (low_root.height(), high_root.height());

        let mut tree = Self {
            root: Link::Virtual,
            max,
            num_nodes,
        };
        let mut parent = Link::Virtual;
        unsafe {
            let pivot = &mut *pivot_ptr.as_ptr();
            if low_height >= high_height {
                tree.root = low_root;
                let mut current = low_root;
                while current.height() > high_height {
                    parent = current;
                    current = current.right();
                }
                pivot.left = current;
                pivot.right = high_root;
                current.set_parent(Link::Real(pivot_ptr));
                high_root.set_parent(Link::Real(pivot_ptr));
                pivot.parent = parent;
                match parent {
                    Link::Virtual => tree.root = Link::Real(pivot_ptr),
                    Link::Real(mut parent_ptr) => parent_ptr.as_mut().right = Link::Real(pivot_ptr),
                }
            } else {
                tree.root = high_root;
                let mut current = high_root;
                while current.height() > low_height {
                    parent = current;
                    current = current.left();
                }
                pivot.right = current;
                pivot.left = low_root;
                current.set_parent(Link::Real(pivot_ptr));
                low_root.set_parent(Link::Real(pivot_ptr));
                pivot.parent = parent;
                match parent {
                    Link::Virtual => tree.root = Link::Real(pivot_ptr),
                    Link::Real(mut parent_ptr) => parent_ptr.as_mut().left = Link::Real(pivot_ptr),
                }
            }
            pivot.update_height();
        }
        trace!(low_height, high_height, "join splice");

        tree.rebalance_insertion(parent);
        tree
    }
}

use tracing::trace;

use super::FingerTree;
use crate::node::{Link, NodePtr};

/// Work counted while retracing toward the root.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Retrace {
    pub(crate) promotes: usize,
    pub(crate) rotations: usize,
}

impl<K, V> FingerTree<K, V> {
    fn rotate_left(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            let mut right_ptr = match node_ptr.as_ref().right {
                Link::Real(right_ptr) => right_ptr,
                Link::Virtual => return node_ptr,
            };
            let right_left = right_ptr.as_ref().left;
            node_ptr.as_mut().right = right_left;
            right_left.set_parent(Link::Real(node_ptr));

            let parent = node_ptr.as_ref().parent;
            self.replace_child(parent, node_ptr, Link::Real(right_ptr));

            right_ptr.as_mut().left = Link::Real(node_ptr);
            node_ptr.as_mut().parent = Link::Real(right_ptr);

            node_ptr.as_mut().update_height();
            right_ptr.as_mut().update_height();
            right_ptr
        }
    }

    fn rotate_right(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            let mut left_ptr = match node_ptr.as_ref().left {
                Link::Real(left_ptr) => left_ptr,
                Link::Virtual => return node_ptr,
            };
            let left_right = left_ptr.as_ref().right;
            node_ptr.as_mut().left = left_right;
            left_right.set_parent(Link::Real(node_ptr));

            let parent = node_ptr.as_ref().parent;
            self.replace_child(parent, node_ptr, Link::Real(left_ptr));

            left_ptr.as_mut().right = Link::Real(node_ptr);
            node_ptr.as_mut().parent = Link::Real(left_ptr);

            node_ptr.as_mut().update_height();
            left_ptr.as_mut().update_height();
            left_ptr
        }
    }

    /// Double rotation for a right-heavy node whose right child leans left.
    fn rotate_right_left(&mut self, node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        if let Link::Real(right_ptr) = unsafe { node_ptr.as_ref().right } {
            self.rotate_right(right_ptr);
        }
        self.rotate_left(node_ptr)
    }

    /// Double rotation for a left-heavy node whose left child leans right.
    fn rotate_left_right(&mut self, node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        if let Link::Real(left_ptr) = unsafe { node_ptr.as_ref().left } {
            self.rotate_left(left_ptr);
        }
        self.rotate_right(node_ptr)
    }

    /// Restores the AVL condition at a node whose balance factor is +2 or -2.
    /// Single rotation when the heavy child leans the same way or not at all,
    /// double rotation otherwise. Returns the new root of the subtree.
    fn rebalance_node(&mut self, node_ptr: NodePtr<K, V>, retrace: &mut Retrace) -> NodePtr<K, V> {
        let (balance, left, right) = unsafe {
            let node = node_ptr.as_ref();
            (node.balance_factor(), node.left, node.right)
        };
        debug_assert!(balance.abs() == 2);
        let child_balance = |child: Link<K, V>| match child {
            Link::Real(child_ptr) => unsafe { child_ptr.as_ref().balance_factor() },
            Link::Virtual => 0,
        };
        if balance > 0 {
            if child_balance(left) < 0 {
                trace!("double rotation, left-right");
                retrace.rotations += 2;
                self.rotate_left_right(node_ptr)
            } else {
                trace!("single rotation, right");
                retrace.rotations += 1;
                self.rotate_right(node_ptr)
            }
        } else if child_balance(right) > 0 {
            trace!("double rotation, right-left");
            retrace.rotations += 2;
            self.rotate_right_left(node_ptr)
        } else {
            trace!("single rotation, left");
            retrace.rotations += 1;
            self.rotate_left(node_ptr)
        }
    }

    /// Retraces from the parent of a grown subtree toward the root.
    ///
    /// Each level recomputes its height. A level that stays balanced and
    /// keeps its height ends the walk; one that grows is a promote and the
    /// walk moves up; one that leans by two is rotated, after which the walk
    /// ends unless the rotated subtree still grew (possible only after a
    /// join splice, never after a plain insertion).
    pub(super) fn rebalance_insertion(&mut self, start_from: Link<K, V>) -> Retrace {
        let mut retrace = Retrace::default();
        let mut current = start_from;
        while let Link::Real(node_ptr) = current {
            let (old_height, balance) = unsafe {
                let node = node_ptr.as_ref();
                (node.height, node.balance_factor())
            };
            let subtree_ptr = if balance.abs() < 2 {
                unsafe { (*node_ptr.as_ptr()).update_height() };
                node_ptr
            } else {
                self.rebalance_node(node_ptr, &mut retrace)
            };
            let subtree = unsafe { subtree_ptr.as_ref() };
            if subtree.height == old_height {
                break;
            }
            if balance.abs() < 2 {
                retrace.promotes += 1;
            }
            current = subtree.parent;
        }
        retrace
    }

    /// Retraces from the lowest vertex whose subtree lost one level.
    ///
    /// Levels are classified by their stored height minus each child's
    /// height: `(1, 1)`, `(1, 2)` and `(2, 1)` are settled, `(2, 2)` shrinks by
    /// one and passes the loss upward, a difference of 3 on one side rotates
    /// toward the other. A single rotation over a balanced child keeps the
    /// subtree height and ends the walk; any other rotation shrinks it and the
    /// walk continues from the rotated subtree's parent.
    pub(super) fn rebalance_deletion(&mut self, start_from: Link<K, V>) -> Retrace {
        let mut retrace = Retrace::default();
        let mut current = start_from;
        while let Link::Real(node_ptr) = current {
            let node = unsafe { &mut *node_ptr.as_ptr() };
            match node.height_diffs() {
                (1, 1) | (1, 2) | (2, 1) => break,
                (2, 2) => {
                    node.height -= 1;
                    current = node.parent;
                }
                diffs => {
                    debug_assert!(diffs == (3, 1) || diffs == (1, 3), "{diffs:?}");
                    let heavy = if diffs.0 > diffs.1 {
                        node.right
                    } else {
                        node.left
                    };
                    let heavy_balanced = match heavy {
                        Link::Real(heavy_ptr) => unsafe { heavy_ptr.as_ref().balance_factor() == 0 },
                        Link::Virtual => false,
                    };
                    let subtree_ptr = self.rebalance_node(node_ptr, &mut retrace);
                    if heavy_balanced {
                        break;
                    }
                    current = unsafe { subtree_ptr.as_ref().parent };
                }
            }
        }
        retrace
    }
}

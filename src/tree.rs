use std::cmp::Ordering;
use std::fmt;
use std::mem;

use tracing::debug;

use crate::error::TreeError;
use crate::iter::Iter;
use crate::node::{Handle, Link, Node, NodePtr, NodeRef};

mod join;
mod rebalance;

pub use join::Split;

/// An AVL tree that keeps a finger on its maximum.
///
/// Besides root-based search and insertion, lookups and insertions can start
/// from the cached maximum and climb only as far as the target requires,
/// which is cheap for keys clustered near the top of the key range.
/// Two trees separated by a pivot key can be joined, and a tree can be split
/// at one of its vertices, both in logarithmic time.
///
/// ```
/// use finger_avl::FingerTree;
/// let mut tree = FingerTree::new();
/// for key in [10, 5, 15, 3, 7, 12, 20] {
///     tree.insert(key, key * 10).unwrap();
/// }
/// let found = tree.finger_search(&12);
/// assert_eq!(found.node.map(|node| *node.value()), Some(120));
/// assert_eq!(tree.max().map(|node| *node.key()), Some(20));
/// ```
pub struct FingerTree<K, V> {
    root: Link<K, V>,
    max: Link<K, V>,
    num_nodes: usize,
}

/// Outcome of [`FingerTree::search`] and [`FingerTree::finger_search`].
#[derive(Debug)]
pub struct Search<'a, K, V> {
    /// The vertex holding the key, if present.
    pub node: Option<NodeRef<'a, K, V>>,
    /// Number of vertices visited, including the ascent of a finger search.
    /// For a hit this is the number of edges walked plus one.
    pub cost: usize,
}

/// Outcome of [`FingerTree::insert`] and [`FingerTree::finger_insert`].
#[derive(Debug)]
pub struct Inserted<K, V> {
    pub node: Handle<K, V>,
    /// Edges walked from the starting vertex to the new vertex before
    /// rebalancing. A finger insertion includes its ascent from the maximum.
    pub edges: usize,
    /// Ancestors whose height grew without needing a rotation.
    pub promotes: usize,
    /// Single rotations performed while rebalancing; a double rotation counts two.
    pub rotations: usize,
}

impl<K, V> FingerTree<K, V> {
    /// Creates an empty tree.
    /// No memory is allocated until the first item is inserted.
    pub const fn new() -> Self {
        Self {
            root: Link::Virtual,
            max: Link::Virtual,
            num_nodes: 0,
        }
    }

    /// Returns true if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        !self.root.is_real()
    }

    /// Returns the number of elements in the tree.
    #[doc(alias = "size")]
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the number of levels: 0 for an empty tree, 1 for a single vertex.
    pub fn height(&self) -> usize {
        (self.root.height() + 1) as usize
    }

    pub fn root(&self) -> Option<NodeRef<'_, K, V>> {
        NodeRef::from_link(self.root)
    }

    /// Returns the vertex with the smallest key by walking left from the root.
    pub fn min(&self) -> Option<NodeRef<'_, K, V>> {
        NodeRef::from_link(self.root.leftmost())
    }

    /// Returns the vertex with the largest key from the cached finger.
    pub fn max(&self) -> Option<NodeRef<'_, K, V>> {
        NodeRef::from_link(self.max)
    }

    /// Returns the vertex following `node` in key order, or `None` if `node`
    /// holds the maximum.
    pub fn successor<'a>(&'a self, node: NodeRef<'a, K, V>) -> Option<NodeRef<'a, K, V>> {
        if self.max == Link::Real(node.ptr()) {
            return None;
        }
        NodeRef::from_link(Node::successor(node.ptr()))
    }

    /// Gets an iterator over the entries of the tree in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.leftmost(), self.num_nodes)
    }

    /// Clears the tree, deallocating all memory.
    pub fn clear(&mut self) {
        self.postorder(|node_ptr| unsafe {
            Node::destroy(node_ptr);
        });
        self.root = Link::Virtual;
        self.max = Link::Virtual;
        self.num_nodes = 0;
    }

    /// Re-derives the cached maximum by walking right from the root.
    fn update_max(&mut self) {
        self.max = self.root.rightmost();
    }

    /// Wraps a subtree cut loose from its parent into a tree of its own.
    /// Count and maximum are left for the caller to settle.
    fn detach(root: Link<K, V>) -> Self {
        root.set_parent(Link::Virtual);
        Self {
            root,
            max: Link::Virtual,
            num_nodes: 0,
        }
    }

    /// Empties the tree without freeing its vertices and returns the root
    /// that now owns them.
    fn into_root(mut self) -> Link<K, V> {
        self.max = Link::Virtual;
        self.num_nodes = 0;
        mem::replace(&mut self.root, Link::Virtual)
    }

    /// Replaces the child `old` of `parent` by `new`, or the root if
    /// `parent` is virtual.
    fn replace_child(&mut self, parent: Link<K, V>, old: NodePtr<K, V>, new: Link<K, V>) {
        new.set_parent(parent);
        match parent {
            Link::Virtual => self.root = new,
            Link::Real(mut parent_ptr) => unsafe {
                let parent = parent_ptr.as_mut();
                if parent.left == Link::Real(old) {
                    parent.left = new;
                } else {
                    parent.right = new;
                }
            },
        }
    }

    fn unlink_node(&mut self, node_ptr: NodePtr<K, V>) {
        unsafe {
            let (left, right, parent, height) = {
                let node = node_ptr.as_ref();
                (node.left, node.right, node.parent, node.height)
            };

            // The maximum has no right child, so its predecessor is its left
            // child (a leaf) or else its parent.
            if self.max == Link::Real(node_ptr) {
                self.max = if left.is_real() { left } else { parent };
            }

            let rebalance_from = if let (Link::Real(_), Link::Real(mut right_ptr)) = (left, right)
            {
                // Two children: the in-order successor takes the node's place.
                let mut succ_ptr = right_ptr;
                while let Link::Real(left_ptr) = succ_ptr.as_ref().left {
                    succ_ptr = left_ptr;
                }

                let rebalance_from = if succ_ptr == right_ptr {
                    // Successor keeps its own right subtree
                    Link::Real(succ_ptr)
                } else {
                    let succ_right = succ_ptr.as_ref().right;
                    let succ_parent = succ_ptr.as_ref().parent;
                    if let Link::Real(mut succ_parent_ptr) = succ_parent {
                        succ_parent_ptr.as_mut().left = succ_right;
                    }
                    succ_right.set_parent(succ_parent);

                    succ_ptr.as_mut().right = right;
                    right_ptr.as_mut().parent = Link::Real(succ_ptr);
                    succ_parent
                };

                succ_ptr.as_mut().left = left;
                left.set_parent(Link::Real(succ_ptr));
                succ_ptr.as_mut().height = height;
                self.replace_child(parent, node_ptr, Link::Real(succ_ptr));
                rebalance_from
            } else {
                // Leaf or single child: splice the child (maybe virtual) in.
                let child = if left.is_real() { left } else { right };
                self.replace_child(parent, node_ptr, child);
                parent
            };

            self.rebalance_deletion(rebalance_from);
        }
    }

    fn postorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(|_| {}, |_| {}, f);
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn preorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(f, |_| {}, |_| {});
    }

    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(NodePtr<K, V>),
        In: FnMut(NodePtr<K, V>),
        Post: FnMut(NodePtr<K, V>),
    {
        if let Link::Real(mut node_ptr) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(node_ptr);
                        if let Link::Real(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(node_ptr);
                        if let Link::Real(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Link::Real(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Link::Real(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<K: Ord, V> FingerTree<K, V> {
    /// Searches for `key` starting at the root.
    pub fn search(&self, key: &K) -> Search<'_, K, V> {
        let (found, cost) = Self::search_from(self.root, key);
        Search {
            node: NodeRef::from_link(found),
            cost,
        }
    }

    /// Searches for `key` starting at the cached maximum.
    ///
    /// Climbs the right spine from the maximum to the lowest ancestor whose
    /// subtree spans `key`, then descends from there. Finds the same vertex
    /// as [`search`](Self::search); only the reported cost differs.
    pub fn finger_search(&self, key: &K) -> Search<'_, K, V> {
        let (anchor, ascent) = self.finger_anchor(key);
        let (found, cost) = Self::search_from(anchor, key);
        Search {
            node: NodeRef::from_link(found),
            cost: ascent + cost,
        }
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        Self::search_from(self.root, key)
            .0
            .ptr()
            .map(|node_ptr| &unsafe { &*node_ptr.as_ptr() }.value)
    }

    /// Returns true if the tree contains the key.
    pub fn contains_key(&self, key: &K) -> bool {
        Self::search_from(self.root, key).0.is_real()
    }

    /// Inserts a key-value pair, descending from the root.
    ///
    /// Fails with [`TreeError::DuplicateKey`] if the key is already present.
    pub fn insert(&mut self, key: K, value: V) -> Result<Inserted<K, V>, TreeError>
    where
        K: Clone,
    {
        let (node_ptr, edges, retrace) = self.insert_from(self.root, 0, key, value)?;
        Ok(Inserted {
            node: Handle::new(node_ptr),
            edges,
            promotes: retrace.promotes,
            rotations: retrace.rotations,
        })
    }

    /// Inserts a key-value pair, descending from the same anchor that
    /// [`finger_search`](Self::finger_search) climbs to.
    ///
    /// The resulting shape is the same as with [`insert`](Self::insert).
    pub fn finger_insert(&mut self, key: K, value: V) -> Result<Inserted<K, V>, TreeError>
    where
        K: Clone,
    {
        let (anchor, ascent) = self.finger_anchor(&key);
        let (node_ptr, edges, retrace) = self.insert_from(anchor, ascent, key, value)?;
        Ok(Inserted {
            node: Handle::new(node_ptr),
            edges,
            promotes: retrace.promotes,
            rotations: retrace.rotations,
        })
    }

    /// Removes the vertex named by `node` and returns its entry.
    pub fn delete(&mut self, node: Handle<K, V>) -> Result<(K, V), TreeError> {
        let node_ptr = self.locate(&node)?;
        debug_assert!(self.num_nodes >= 1);
        self.unlink_node(node_ptr);
        self.num_nodes -= 1;
        Ok(unsafe { Node::destroy(node_ptr) })
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Link::Real(root_ptr) = self.root {
                assert!(root_ptr.as_ref().parent == Link::Virtual);
            }

            // Check tree nodes
            let mut num_nodes = 0;
            self.preorder(|node_ptr| {
                let node = node_ptr.as_ref();

                // Check link for left child node
                if let Link::Real(left_ptr) = node.left {
                    assert!(left_ptr.as_ref().parent == Link::Real(node_ptr));
                    assert!(left_ptr.as_ref().key < node.key);
                }

                // Check link for right child node
                if let Link::Real(right_ptr) = node.right {
                    assert!(right_ptr.as_ref().parent == Link::Real(node_ptr));
                    assert!(right_ptr.as_ref().key > node.key);
                }

                // Check height
                let expected = 1 + std::cmp::max(node.left.height(), node.right.height());
                assert_eq!(node.height, expected);

                // Check AVL condition (nearly balance)
                assert!((-1..=1).contains(&node.balance_factor()));

                num_nodes += 1;
            });

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);

            // Check global key order and the cached maximum
            let mut keys = self.iter().map(|(key, _)| key);
            if let Some(mut prev) = keys.next() {
                for key in keys {
                    assert!(prev < key);
                    prev = key;
                }
            }
            assert!(self.max == self.root.rightmost());
        }
    }

    fn search_from(start: Link<K, V>, key: &K) -> (Link<K, V>, usize) {
        let mut current = start;
        let mut cost = 0;
        while let Link::Real(node_ptr) = current {
            cost += 1;
            current = unsafe {
                match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => return (current, cost),
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            };
        }
        (Link::Virtual, cost)
    }

    /// Climbs from the maximum while the parent is still on the ascending
    /// right spine and `key` does not lie above the parent's key. Returns the
    /// vertex reached and the number of edges climbed.
    fn finger_anchor(&self, key: &K) -> (Link<K, V>, usize) {
        let mut current = match self.max {
            Link::Virtual => return (Link::Virtual, 0),
            Link::Real(max_ptr) => max_ptr,
        };
        let mut ascent = 0;
        unsafe {
            while let Link::Real(parent_ptr) = current.as_ref().parent {
                let parent = parent_ptr.as_ref();
                if current.as_ref().key <= parent.key || *key > parent.key {
                    break;
                }
                current = parent_ptr;
                ascent += 1;
            }
        }
        (Link::Real(current), ascent)
    }

    /// Resolves a handle to its vertex, checking it belongs to this tree.
    fn locate(&self, handle: &Handle<K, V>) -> Result<NodePtr<K, V>, TreeError> {
        match Self::search_from(self.root, handle.key()).0 {
            Link::Real(node_ptr) if node_ptr == handle.ptr() => Ok(node_ptr),
            _ => {
                debug!(len = self.num_nodes, "handle does not belong to tree");
                Err(TreeError::NodeNotFound)
            }
        }
    }

    /// Attaches a new vertex below `start` and rebalances.
    /// `edges` is the count already spent reaching `start`.
    fn insert_from(
        &mut self,
        start: Link<K, V>,
        mut edges: usize,
        key: K,
        value: V,
    ) -> Result<(NodePtr<K, V>, usize, rebalance::Retrace), TreeError> {
        let mut parent = Link::Virtual;
        let mut current = start;
        let mut go_left = false;
        while let Link::Real(node_ptr) = current {
            let node = unsafe { node_ptr.as_ref() };
            go_left = match key.cmp(&node.key) {
                Ordering::Equal => {
                    debug!(len = self.num_nodes, "insert rejected, key already present");
                    return Err(TreeError::DuplicateKey);
                }
                Ordering::Less => true,
                Ordering::Greater => false,
            };
            parent = current;
            current = if go_left { node.left } else { node.right };
            edges += 1;
        }

        let new_max = parent == self.max && !go_left;
        let node_ptr = Node::create(parent, key, value);
        match parent {
            Link::Virtual => self.root = Link::Real(node_ptr),
            Link::Real(mut parent_ptr) => unsafe {
                if go_left {
                    parent_ptr.as_mut().left = Link::Real(node_ptr);
                } else {
                    parent_ptr.as_mut().right = Link::Real(node_ptr);
                }
            },
        }
        if new_max {
            self.max = Link::Real(node_ptr);
        }
        self.num_nodes += 1;

        let retrace = self.rebalance_insertion(parent);
        Ok((node_ptr, edges, retrace))
    }
}

impl<K, V> Drop for FingerTree<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> Default for FingerTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for FingerTree<K, V> {
    /// Builds a tree from an iterator; later duplicates of a key are dropped.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for FingerTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            let _ = self.insert_from(self.root, 0, key, value);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for FingerTree<K, V> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a FingerTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

use std::cmp;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

pub(crate) type NodePtr<K, V> = NonNull<Node<K, V>>;

/// A link between tree vertices.
///
/// `Virtual` stands in for every absent vertex: missing children, the parent
/// of the root, the root of an empty tree. It behaves like a perpetual leaf
/// of height -1, so height and balance computations never special-case it.
pub(crate) enum Link<K, V> {
    Virtual,
    Real(NodePtr<K, V>),
}

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
    pub(crate) parent: Link<K, V>,
    pub(crate) height: i32,
}

impl<K, V> Clone for Link<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Link<K, V> {}

impl<K, V> PartialEq for Link<K, V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Link::Virtual, Link::Virtual) => true,
            (Link::Real(lhs), Link::Real(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl<K, V> Eq for Link<K, V> {}

impl<K, V> Link<K, V> {
    pub(crate) fn is_real(self) -> bool {
        matches!(self, Link::Real(_))
    }

    pub(crate) fn ptr(self) -> Option<NodePtr<K, V>> {
        match self {
            Link::Virtual => None,
            Link::Real(node_ptr) => Some(node_ptr),
        }
    }

    pub(crate) fn height(self) -> i32 {
        match self {
            Link::Virtual => -1,
            Link::Real(node_ptr) => unsafe { node_ptr.as_ref().height },
        }
    }

    pub(crate) fn left(self) -> Link<K, V> {
        match self {
            Link::Virtual => Link::Virtual,
            Link::Real(node_ptr) => unsafe { node_ptr.as_ref().left },
        }
    }

    pub(crate) fn right(self) -> Link<K, V> {
        match self {
            Link::Virtual => Link::Virtual,
            Link::Real(node_ptr) => unsafe { node_ptr.as_ref().right },
        }
    }

    /// Points the parent link of a real vertex at `parent`; no-op on `Virtual`.
    pub(crate) fn set_parent(self, parent: Link<K, V>) {
        if let Link::Real(mut node_ptr) = self {
            unsafe { node_ptr.as_mut().parent = parent };
        }
    }

    /// Leftmost real vertex of the subtree, or `Virtual` for an empty one.
    pub(crate) fn leftmost(self) -> Link<K, V> {
        let mut current = self;
        while let Link::Real(node_ptr) = current {
            let left = unsafe { node_ptr.as_ref().left };
            if !left.is_real() {
                break;
            }
            current = left;
        }
        current
    }

    /// Rightmost real vertex of the subtree, or `Virtual` for an empty one.
    pub(crate) fn rightmost(self) -> Link<K, V> {
        let mut current = self;
        while let Link::Real(node_ptr) = current {
            let right = unsafe { node_ptr.as_ref().right };
            if !right.is_real() {
                break;
            }
            current = right;
        }
        current
    }

    /// Counts the real vertices of the subtree.
    pub(crate) fn count(self) -> usize {
        let mut num_nodes = 0;
        let mut stack = Vec::new();
        if let Link::Real(root_ptr) = self {
            stack.push(root_ptr);
        }
        while let Some(node_ptr) = stack.pop() {
            num_nodes += 1;
            let node = unsafe { node_ptr.as_ref() };
            for child in [node.left, node.right] {
                if let Link::Real(child_ptr) = child {
                    stack.push(child_ptr);
                }
            }
        }
        num_nodes
    }
}

impl<K, V> Node<K, V> {
    pub(crate) fn create(parent: Link<K, V>, key: K, value: V) -> NodePtr<K, V> {
        let boxed = Box::new(Node {
            key,
            value,
            left: Link::Virtual,
            right: Link::Virtual,
            parent,
            height: 0,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    /// Frees a vertex that is no longer linked from any tree.
    pub(crate) unsafe fn destroy(node_ptr: NodePtr<K, V>) -> (K, V) {
        let node = Box::from_raw(node_ptr.as_ptr());
        (node.key, node.value)
    }

    pub(crate) fn is_leaf(&self) -> bool {
        !self.left.is_real() && !self.right.is_real()
    }

    pub(crate) fn update_height(&mut self) {
        self.height = 1 + cmp::max(self.left.height(), self.right.height());
    }

    /// Left height minus right height. Both children of a leaf are virtual,
    /// so a leaf comes out at 0.
    pub(crate) fn balance_factor(&self) -> i32 {
        self.left.height() - self.right.height()
    }

    /// Stored height minus each child's height, as `(left, right)`.
    pub(crate) fn height_diffs(&self) -> (i32, i32) {
        (
            self.height - self.left.height(),
            self.height - self.right.height(),
        )
    }

    /// In-order successor by structure alone: leftmost vertex of the right
    /// subtree, else the first ancestor reached from its left side.
    pub(crate) fn successor(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        unsafe {
            let right = node_ptr.as_ref().right;
            if right.is_real() {
                return right.leftmost();
            }
            let mut current = node_ptr;
            while let Link::Real(parent_ptr) = current.as_ref().parent {
                if parent_ptr.as_ref().left == Link::Real(current) {
                    return Link::Real(parent_ptr);
                }
                current = parent_ptr;
            }
            Link::Virtual
        }
    }
}

/// A borrowed, read-only view of a vertex inside a [`FingerTree`].
///
/// [`FingerTree`]: crate::FingerTree
pub struct NodeRef<'a, K, V> {
    ptr: NodePtr<K, V>,
    _marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> Clone for NodeRef<'a, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, K, V> Copy for NodeRef<'a, K, V> {}

impl<'a, K, V> NodeRef<'a, K, V> {
    pub(crate) fn new(ptr: NodePtr<K, V>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    pub(crate) fn from_link(link: Link<K, V>) -> Option<Self> {
        link.ptr().map(Self::new)
    }

    pub(crate) fn ptr(self) -> NodePtr<K, V> {
        self.ptr
    }

    fn node(self) -> &'a Node<K, V> {
        unsafe { &*self.ptr.as_ptr() }
    }

    pub fn key(self) -> &'a K {
        &self.node().key
    }

    pub fn value(self) -> &'a V {
        &self.node().value
    }

    /// Height of the subtree rooted here; a leaf has height 0.
    pub fn height(self) -> i32 {
        self.node().height
    }

    /// Height of the left subtree minus height of the right subtree.
    pub fn balance_factor(self) -> i32 {
        self.node().balance_factor()
    }

    pub fn is_leaf(self) -> bool {
        self.node().is_leaf()
    }

    pub fn left(self) -> Option<Self> {
        Self::from_link(self.node().left)
    }

    pub fn right(self) -> Option<Self> {
        Self::from_link(self.node().right)
    }

    pub fn parent(self) -> Option<Self> {
        Self::from_link(self.node().parent)
    }

    /// Returns `true` if both views name the same vertex.
    pub fn ptr_eq(self, other: NodeRef<'_, K, V>) -> bool {
        self.ptr == other.ptr
    }

    /// Returns an owned handle that can later be passed to
    /// [`FingerTree::delete`] or [`FingerTree::split`].
    ///
    /// [`FingerTree::delete`]: crate::FingerTree::delete
    /// [`FingerTree::split`]: crate::FingerTree::split
    pub fn handle(self) -> Handle<K, V>
    where
        K: Clone,
    {
        Handle::new(self.ptr)
    }
}

impl<'a, K: fmt::Debug, V: fmt::Debug> fmt::Debug for NodeRef<'a, K, V> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("NodeRef")
            .field("key", self.key())
            .field("value", self.value())
            .field("height", &self.height())
            .finish()
    }
}

/// An owned token naming a vertex by identity and key.
///
/// Operations taking a handle first locate its key from the root and
/// compare identity, so a handle to a deleted vertex or to a vertex of
/// another tree is rejected instead of being dereferenced.
pub struct Handle<K, V> {
    ptr: NodePtr<K, V>,
    key: K,
}

impl<K: Clone, V> Handle<K, V> {
    pub(crate) fn new(ptr: NodePtr<K, V>) -> Self {
        let key = unsafe { ptr.as_ref().key.clone() };
        Self { ptr, key }
    }
}

impl<K, V> Handle<K, V> {
    /// Key of the vertex at the time the handle was taken.
    pub fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn ptr(&self) -> NodePtr<K, V> {
        self.ptr
    }
}

impl<K: Clone, V> Clone for Handle<K, V> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            key: self.key.clone(),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Handle<K, V> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("Handle").field(&self.key).finish()
    }
}
